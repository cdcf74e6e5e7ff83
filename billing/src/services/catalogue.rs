use billhub_database::BillingStore;
use billhub_models::{CreateProviderRequest, Provider};
use std::sync::Arc;
use validator::Validate;

use super::providers::{HttpBillProvider, ProviderRegistry};

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("provider name {0} is already registered")]
    NameTaken(String),
    #[error("provider {0} not found")]
    NotFound(String),
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Provider catalogue maintenance. New entries are served over HTTP as soon
/// as they are created.
#[derive(Clone)]
pub struct ProviderCatalogue {
    store: Arc<dyn BillingStore>,
    registry: Arc<ProviderRegistry>,
}

impl ProviderCatalogue {
    pub fn new(store: Arc<dyn BillingStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    pub async fn create_provider(&self, request: CreateProviderRequest) -> Result<Provider, CatalogueError> {
        request
            .validate()
            .map_err(|e| CatalogueError::Validation(e.to_string()))?;
        if !request.has_known_auth_type() {
            return Err(CatalogueError::Validation(format!(
                "unsupported auth_type {}",
                request.auth_type
            )));
        }

        let name = request.name.trim().to_string();
        let existing = self.store.list_providers().await?;
        if existing.iter().any(|p| p.name.eq_ignore_ascii_case(&name)) {
            return Err(CatalogueError::NameTaken(name));
        }

        let created = self
            .store
            .create_provider(&Provider::new(name, request.api_endpoint, request.auth_type))
            .await?;
        self.registry
            .register(Arc::new(HttpBillProvider::new(created.clone())));
        tracing::info!(provider_id = %created.id, endpoint = %created.api_endpoint, "Registered provider {}", created.name);
        Ok(created)
    }

    pub async fn get_provider(&self, provider_id: &str) -> Result<Provider, CatalogueError> {
        self.store
            .find_provider(provider_id)
            .await?
            .ok_or_else(|| CatalogueError::NotFound(provider_id.to_string()))
    }
}

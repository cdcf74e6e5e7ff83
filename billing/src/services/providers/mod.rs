pub mod http;
pub mod simulated;

pub use http::HttpBillProvider;
pub use simulated::SimulatedBillProvider;

use async_trait::async_trait;
use billhub_models::{Bill, LinkedAccount, Provider};
use dashmap::DashMap;
use std::sync::Arc;

use crate::services::retry::Retryable;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("provider responded with status {status}")]
    Upstream { status: u16 },
    #[error("provider rejected the credentials")]
    Unauthorized,
    #[error("malformed provider payload: {0}")]
    Malformed(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::UnknownProvider(_) | ProviderError::Unauthorized)
    }
}

/// A third-party source of bills.
#[async_trait]
pub trait BillProvider: Send + Sync {
    async fn fetch_bills(&self, account: &LinkedAccount) -> Result<Vec<Bill>, ProviderError>;

    async fn validate_credentials(&self, credentials: &str) -> Result<bool, ProviderError>;

    fn provider_info(&self) -> Provider;
}

/// Dispatches to the provider registered under each account's provider id.
/// Providers created at runtime can be registered through a shared handle.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: DashMap<String, Arc<dyn BillProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the id reported by `provider_info`. Replaces any
    /// provider already registered under that id.
    pub fn register(&self, provider: Arc<dyn BillProvider>) {
        let id = provider.provider_info().id;
        self.providers.insert(id, provider);
    }

    pub fn with(self, provider: Arc<dyn BillProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn BillProvider>> {
        self.providers.get(provider_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Catalogue of registered providers, sorted by name.
    pub fn catalogue(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self
            .providers
            .iter()
            .map(|entry| entry.value().provider_info())
            .collect();
        providers.sort_by(|a, b| a.name.cmp(&b.name));
        providers
    }

    pub async fn validate_credentials_for(&self, provider_id: &str, credentials: &str) -> Result<bool, ProviderError> {
        match self.get(provider_id) {
            Some(provider) => provider.validate_credentials(credentials).await,
            None => Err(ProviderError::UnknownProvider(provider_id.to_string())),
        }
    }
}

#[async_trait]
impl BillProvider for ProviderRegistry {
    async fn fetch_bills(&self, account: &LinkedAccount) -> Result<Vec<Bill>, ProviderError> {
        match self.get(&account.provider_id) {
            Some(provider) => provider.fetch_bills(account).await,
            None => Err(ProviderError::UnknownProvider(account.provider_id.clone())),
        }
    }

    async fn validate_credentials(&self, _credentials: &str) -> Result<bool, ProviderError> {
        Err(ProviderError::UnknownProvider("registry".to_string()))
    }

    fn provider_info(&self) -> Provider {
        let now = chrono::Utc::now();
        Provider {
            id: "registry".to_string(),
            name: "Provider registry".to_string(),
            api_endpoint: String::new(),
            auth_type: "none".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

use billhub_database::{BillingStore, CacheKeys};
use billhub_models::{LinkAccountRequest, LinkedAccount};
use std::sync::Arc;
use validator::Validate;

use super::cache::BillCache;
use super::providers::{ProviderError, ProviderRegistry};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("provider {0} is not registered")]
    UnknownProvider(String),
    #[error("provider rejected the credentials")]
    InvalidCredentials,
    #[error("credential check failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("linked account {0} not found")]
    NotFound(String),
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Linking and unlinking of provider accounts.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn BillingStore>,
    registry: Arc<ProviderRegistry>,
    cache: Arc<dyn BillCache>,
}

impl AccountService {
    pub fn new(store: Arc<dyn BillingStore>, registry: Arc<ProviderRegistry>, cache: Arc<dyn BillCache>) -> Self {
        Self { store, registry, cache }
    }

    pub async fn list_accounts(&self, user_id: &str) -> Result<Vec<LinkedAccount>, AccountError> {
        Ok(self.store.linked_accounts_for_user(user_id).await?)
    }

    pub async fn link_account(&self, user_id: &str, request: LinkAccountRequest) -> Result<LinkedAccount, AccountError> {
        request
            .validate()
            .map_err(|e| AccountError::Validation(e.to_string()))?;

        if !self.registry.contains(&request.provider_id) {
            return Err(AccountError::UnknownProvider(request.provider_id));
        }

        let valid = self
            .registry
            .validate_credentials_for(&request.provider_id, &request.credentials)
            .await?;
        if !valid {
            return Err(AccountError::InvalidCredentials);
        }

        let account = LinkedAccount::new(user_id, request.provider_id, request.account_id, request.credentials);
        let created = self.store.create_linked_account(&account).await?;
        tracing::info!(user_id = %user_id, account_id = %created.id, provider_id = %created.provider_id, "Linked account");
        Ok(created)
    }

    pub async fn unlink_account(&self, user_id: &str, account_id: &str) -> Result<(), AccountError> {
        if !self.store.delete_linked_account(user_id, account_id).await? {
            return Err(AccountError::NotFound(account_id.to_string()));
        }

        if let Err(e) = self.cache.delete(&CacheKeys::bills(account_id)).await {
            tracing::warn!(account_id = %account_id, error = %e, "Failed to evict cached bills");
        }
        tracing::info!(user_id = %user_id, account_id = %account_id, "Unlinked account");
        Ok(())
    }
}

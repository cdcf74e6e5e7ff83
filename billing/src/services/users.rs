use bcrypt::DEFAULT_COST;
use billhub_database::{BillingStore, CacheKeys};
use billhub_models::{CreateUserRequest, UpdateUserRequest, User};
use std::sync::Arc;
use validator::Validate;

use super::cache::BillCache;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("email {0} is already registered")]
    EmailTaken(String),
    #[error("user {0} not found")]
    NotFound(String),
    #[error("users may only modify their own record")]
    Forbidden,
    #[error("failed to hash password: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Registration and maintenance of user records. Issuing login tokens is
/// the credential service's job.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn BillingStore>,
    cache: Arc<dyn BillCache>,
    hash_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn BillingStore>, cache: Arc<dyn BillCache>) -> Self {
        Self {
            store,
            cache,
            hash_cost: DEFAULT_COST,
        }
    }

    /// Override the bcrypt work factor.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserError> {
        request.validate().map_err(|e| UserError::Validation(e.to_string()))?;

        let email = request.email.trim().to_string();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(UserError::EmailTaken(email));
        }

        let password_hash = bcrypt::hash(&request.password, self.hash_cost)?;
        let created = self.store.create_user(&User::new(email, password_hash)).await?;
        tracing::info!(user_id = %created.id, "Created user");
        Ok(created)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, UserError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, UserError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn update_user(
        &self,
        caller_id: &str,
        user_id: &str,
        request: UpdateUserRequest,
    ) -> Result<User, UserError> {
        if caller_id != user_id {
            return Err(UserError::Forbidden);
        }
        request.validate().map_err(|e| UserError::Validation(e.to_string()))?;

        let mut user = self.get_user(user_id).await?;
        if let Some(email) = request.email {
            let email = email.trim().to_string();
            if let Some(existing) = self.store.find_user_by_email(&email).await? {
                if existing.id != user.id {
                    return Err(UserError::EmailTaken(email));
                }
            }
            user.email = email;
        }
        if let Some(password) = request.password {
            user.password_hash = bcrypt::hash(&password, self.hash_cost)?;
        }

        if !self.store.update_user(&user).await? {
            return Err(UserError::NotFound(user_id.to_string()));
        }
        tracing::info!(user_id = %user.id, "Updated user");
        Ok(user)
    }

    /// Delete the caller's record. Cached bills of their accounts are evicted.
    pub async fn delete_user(&self, caller_id: &str, user_id: &str) -> Result<(), UserError> {
        if caller_id != user_id {
            return Err(UserError::Forbidden);
        }

        let accounts = self.store.linked_accounts_for_user(user_id).await?;
        if !self.store.delete_user(user_id).await? {
            return Err(UserError::NotFound(user_id.to_string()));
        }

        for account in accounts {
            if let Err(e) = self.cache.delete(&CacheKeys::bills(&account.id)).await {
                tracing::warn!(account_id = %account.id, error = %e, "Failed to evict cached bills");
            }
        }
        tracing::info!(user_id = %user_id, "Deleted user");
        Ok(())
    }
}

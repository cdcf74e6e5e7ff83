// Repository pattern for database operations

pub mod bill;
pub mod linked_account;
pub mod provider;
pub mod user;

pub use bill::BillRepository;
pub use linked_account::LinkedAccountRepository;
pub use provider::ProviderRepository;
pub use user::UserRepository;

use anyhow::{Context, Result};
use async_trait::async_trait;
use billhub_models::{AccountStatus, Bill, LinkedAccount, Provider, User};
use sqlx::PgPool;

/// The storage operations the billing service consumes.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<User>;

    async fn find_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Emails compare case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn update_user(&self, user: &User) -> Result<bool>;

    /// Removes the user together with their linked accounts and bills.
    async fn delete_user(&self, user_id: &str) -> Result<bool>;

    async fn list_providers(&self) -> Result<Vec<Provider>>;

    async fn find_provider(&self, provider_id: &str) -> Result<Option<Provider>>;

    async fn create_provider(&self, provider: &Provider) -> Result<Provider>;

    async fn linked_accounts_for_user(&self, user_id: &str) -> Result<Vec<LinkedAccount>>;

    async fn create_linked_account(&self, account: &LinkedAccount) -> Result<LinkedAccount>;

    /// Delete an account only if it belongs to `user_id`. Returns whether a row was removed.
    async fn delete_linked_account(&self, user_id: &str, account_id: &str) -> Result<bool>;

    async fn update_linked_account_status(&self, account_id: &str, status: AccountStatus) -> Result<()>;

    async fn create_bill(&self, bill: &Bill) -> Result<()>;

    /// Returns false when the account owns no bill with that id yet.
    async fn update_bill(&self, bill: &Bill) -> Result<bool>;

    async fn bills_for_user(&self, user_id: &str) -> Result<Vec<Bill>>;
}

/// Repository manager that provides access to all repositories
#[derive(Clone)]
pub struct RepositoryManager {
    pool: PgPool,
}

impl RepositoryManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn providers(&self) -> ProviderRepository {
        ProviderRepository::new(self.pool.clone())
    }

    pub fn linked_accounts(&self) -> LinkedAccountRepository {
        LinkedAccountRepository::new(self.pool.clone())
    }

    pub fn bills(&self) -> BillRepository {
        BillRepository::new(self.pool.clone())
    }
}

#[async_trait]
impl BillingStore for RepositoryManager {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        self.users().create(user).await
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        self.users().find_by_id(user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users().find_by_email(email).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.users().list().await
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        self.users().update(user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool> {
        self.users().delete(user_id).await
    }

    async fn list_providers(&self) -> Result<Vec<Provider>> {
        self.providers().list().await
    }

    async fn find_provider(&self, provider_id: &str) -> Result<Option<Provider>> {
        self.providers().find_by_id(provider_id).await
    }

    async fn create_provider(&self, provider: &Provider) -> Result<Provider> {
        self.providers().create(provider).await
    }

    async fn linked_accounts_for_user(&self, user_id: &str) -> Result<Vec<LinkedAccount>> {
        self.linked_accounts().find_by_user(user_id).await
    }

    async fn create_linked_account(&self, account: &LinkedAccount) -> Result<LinkedAccount> {
        self.linked_accounts().create(account).await
    }

    async fn delete_linked_account(&self, user_id: &str, account_id: &str) -> Result<bool> {
        self.linked_accounts().delete_for_user(user_id, account_id).await
    }

    async fn update_linked_account_status(&self, account_id: &str, status: AccountStatus) -> Result<()> {
        self.linked_accounts().update_status(account_id, status).await
    }

    async fn create_bill(&self, bill: &Bill) -> Result<()> {
        self.bills().create(bill).await
    }

    async fn update_bill(&self, bill: &Bill) -> Result<bool> {
        self.bills().update(bill).await
    }

    async fn bills_for_user(&self, user_id: &str) -> Result<Vec<Bill>> {
        self.bills().find_by_user(user_id).await
    }
}

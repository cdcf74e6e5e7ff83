use anyhow::{Context, Result};
use billhub_models::{AccountStatus, LinkedAccount};
use sqlx::{query, query_as, PgPool};

const COLUMNS: &str =
    "id, user_id, provider_id, account_id, credentials, status, created_at, updated_at";

pub struct LinkedAccountRepository {
    pool: PgPool,
}

impl LinkedAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, account: &LinkedAccount) -> Result<LinkedAccount> {
        let sql = format!(
            "INSERT INTO linked_accounts (id, user_id, provider_id, account_id, credentials, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            COLUMNS
        );
        let created = query_as::<_, LinkedAccount>(&sql)
            .bind(&account.id)
            .bind(&account.user_id)
            .bind(&account.provider_id)
            .bind(&account.account_id)
            .bind(&account.credentials)
            .bind(account.status)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool)
            .await
            .context("Failed to create linked account")?;

        Ok(created)
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<LinkedAccount>> {
        let sql = format!(
            "SELECT {} FROM linked_accounts WHERE user_id = $1 ORDER BY created_at DESC",
            COLUMNS
        );
        let accounts = query_as::<_, LinkedAccount>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to find accounts by user")?;

        Ok(accounts)
    }

    pub async fn update_status(&self, id: &str, status: AccountStatus) -> Result<()> {
        query("UPDATE linked_accounts SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update linked account status")?;

        Ok(())
    }

    pub async fn delete_for_user(&self, user_id: &str, id: &str) -> Result<bool> {
        let result = query("DELETE FROM linked_accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete linked account")?;

        Ok(result.rows_affected() > 0)
    }
}

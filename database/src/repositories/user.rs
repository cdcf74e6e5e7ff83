use anyhow::{Context, Result};
use billhub_models::User;
use sqlx::{query, query_as, PgPool};

const COLUMNS: &str = "id, email, password_hash, created_at, updated_at";

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &User) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            COLUMNS
        );
        let created = query_as::<_, User>(&sql)
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .context("Failed to create user")?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", COLUMNS);
        let user = query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find user by id")?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", COLUMNS);
        let user = query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find user by email")?;

        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at", COLUMNS);
        let users = query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        Ok(users)
    }

    pub async fn update(&self, user: &User) -> Result<bool> {
        let result = query(
            "UPDATE users SET email = $1, password_hash = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update user {}", user.id))?;

        Ok(result.rows_affected() > 0)
    }

    /// Linked accounts and their bills go with the user via `ON DELETE CASCADE`.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete user {}", id))?;

        Ok(result.rows_affected() > 0)
    }
}

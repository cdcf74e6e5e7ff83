use anyhow::{Context, Result};
use billhub_models::Provider;
use sqlx::{query_as, PgPool};

pub struct ProviderRepository {
    pool: PgPool,
}

impl ProviderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Provider>> {
        let providers = query_as::<_, Provider>(
            "SELECT id, name, api_endpoint, auth_type, created_at, updated_at FROM providers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list providers")?;

        Ok(providers)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Provider>> {
        let provider = query_as::<_, Provider>(
            "SELECT id, name, api_endpoint, auth_type, created_at, updated_at FROM providers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find provider by id")?;

        Ok(provider)
    }

    pub async fn create(&self, provider: &Provider) -> Result<Provider> {
        let created = query_as::<_, Provider>(
            r#"
            INSERT INTO providers (id, name, api_endpoint, auth_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, api_endpoint, auth_type, created_at, updated_at
            "#,
        )
        .bind(&provider.id)
        .bind(&provider.name)
        .bind(&provider.api_endpoint)
        .bind(&provider.auth_type)
        .bind(provider.created_at)
        .bind(provider.updated_at)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to create provider {}", provider.name))?;

        Ok(created)
    }

    /// Insert the catalogue entry, or refresh its endpoint and auth type if it exists.
    pub async fn upsert(&self, provider: &Provider) -> Result<Provider> {
        let provider = query_as::<_, Provider>(
            r#"
            INSERT INTO providers (id, name, api_endpoint, auth_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET api_endpoint = EXCLUDED.api_endpoint,
                auth_type = EXCLUDED.auth_type,
                updated_at = CURRENT_TIMESTAMP
            RETURNING id, name, api_endpoint, auth_type, created_at, updated_at
            "#,
        )
        .bind(&provider.id)
        .bind(&provider.name)
        .bind(&provider.api_endpoint)
        .bind(&provider.auth_type)
        .bind(provider.created_at)
        .bind(provider.updated_at)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert provider {}", provider.id))?;

        Ok(provider)
    }
}

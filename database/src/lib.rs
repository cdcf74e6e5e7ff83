// Persistence layer for billhub: Postgres repositories and the Redis cache

pub mod cache;
pub mod config;
pub mod repositories;

pub use cache::{CacheKeys, RedisCache};
pub use config::DatabaseConfig;
pub use repositories::{BillingStore, RepositoryManager};

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    cache: Option<RedisCache>,
}

impl Database {
    /// Connect to Postgres and, when configured, Redis. An unreachable Redis
    /// only disables the cache.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;

        let cache = match config.redis_url.as_deref() {
            Some(redis_url) => match RedisCache::new(redis_url).await {
                Ok(cache) => Some(cache),
                Err(e) => {
                    tracing::warn!("Redis connection disabled due to error: {:#}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self { pool, cache })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }

    pub fn repositories(&self) -> RepositoryManager {
        RepositoryManager::new(self.pool.clone())
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }
}

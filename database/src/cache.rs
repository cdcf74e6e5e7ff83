use anyhow::{Context, Result};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::time::Duration;

/// Thin Redis wrapper over a shared connection manager.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { manager })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    /// Store a value that expires after `ttl` (rounded up to whole seconds).
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        let seconds = expiry_seconds(ttl);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .context("Redis ping failed")?;
        Ok(())
    }
}

/// Redis expiries are whole seconds; partial seconds round up and the
/// minimum is one second.
fn expiry_seconds(ttl: Duration) -> u64 {
    (ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)).max(1)
}

/// Cache key builder for consistent key naming
pub struct CacheKeys;

impl CacheKeys {
    pub fn bills(account_id: &str) -> String {
        format!("bills:{}", account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_keys_are_scoped_per_account() {
        assert_eq!(CacheKeys::bills("acc-42"), "bills:acc-42");
        assert_ne!(CacheKeys::bills("a"), CacheKeys::bills("b"));
    }

    #[test]
    fn test_expiry_rounds_partial_seconds_up() {
        assert_eq!(expiry_seconds(Duration::from_millis(1900)), 2);
        assert_eq!(expiry_seconds(Duration::from_secs(3600)), 3600);
        assert_eq!(expiry_seconds(Duration::from_millis(1)), 1);
        assert_eq!(expiry_seconds(Duration::ZERO), 1);
    }
}

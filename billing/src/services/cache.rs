use async_trait::async_trait;
use billhub_database::RedisCache;
use billhub_models::Bill;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value store of previously fetched bill sets.
///
/// The typed helpers never fail: any backend or decoding problem is logged
/// and reported as a miss so callers fall through to a live fetch.
#[async_trait]
pub trait BillCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn get_bills(&self, key: &str) -> Option<Vec<Bill>> {
        let raw = match self.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Bill cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(bills) => Some(bills),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cached bills");
                None
            }
        }
    }

    async fn cache_bills(&self, key: &str, bills: &[Bill], ttl: Duration) {
        let payload = match serde_json::to_string(bills) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode bills for cache");
                return;
            }
        };

        if let Err(e) = self.set(key, &payload, ttl).await {
            tracing::warn!(key = %key, error = %e, "Bill cache write failed");
        }
    }
}

#[async_trait]
impl BillCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        RedisCache::get(self, key)
            .await
            .map_err(|e| CacheError::Backend(format!("{:#}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        RedisCache::set(self, key, value, ttl)
            .await
            .map_err(|e| CacheError::Backend(format!("{:#}", e)))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        RedisCache::delete(self, key)
            .await
            .map_err(|e| CacheError::Backend(format!("{:#}", e)))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache used when Redis is disabled or unreachable.
#[derive(Debug, Default)]
pub struct MemoryBillCache {
    entries: DashMap<String, Entry>,
}

impl MemoryBillCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, including keys nobody reads any more.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl BillCache for MemoryBillCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|entry| (entry.expires_at > now, entry.value.clone()));

        match hit {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.cleanup_expired();
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billhub_models::BillStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn bill(id: &str) -> Bill {
        let now = Utc::now();
        Bill {
            id: id.to_string(),
            linked_account_id: "acc-1".to_string(),
            provider_id: "water".to_string(),
            amount: Decimal::new(1999, 2),
            due_date: now,
            bill_date: now,
            status: BillStatus::Unpaid,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = MemoryBillCache::new();
        cache.cache_bills("bills:acc-1", &[bill("b1")], Duration::from_secs(60)).await;

        let cached = cache.get_bills("bills:acc-1").await.unwrap();
        assert_eq!(cached[0].id, "b1");
        assert_eq!(cached[0].amount, Decimal::new(1999, 2));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(cache.get_bills("bills:acc-1").await.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_keys_never_read_again() {
        let cache = MemoryBillCache::new();
        cache.cache_bills("bills:unlinked", &[bill("b1")], Duration::from_secs(60)).await;
        cache.cache_bills("bills:idle", &[bill("b2")], Duration::from_secs(60)).await;
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(Duration::from_secs(61)).await;
        cache.cache_bills("bills:active", &[bill("b3")], Duration::from_secs(60)).await;

        assert_eq!(cache.len(), 1);
        assert!(cache.get_bills("bills:active").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_keeps_live_entries() {
        let cache = MemoryBillCache::new();
        cache.cache_bills("bills:short", &[bill("b1")], Duration::from_secs(10)).await;
        cache.cache_bills("bills:long", &[bill("b2")], Duration::from_secs(100)).await;

        tokio::time::sleep(Duration::from_secs(11)).await;
        cache.cleanup_expired();

        assert_eq!(cache.len(), 1);
        assert!(cache.get_bills("bills:long").await.is_some());
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let cache = MemoryBillCache::new();
        cache.set("bills:acc-2", "{not json", Duration::from_secs(60)).await.unwrap();
        assert!(cache.get_bills("bills:acc-2").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_evicts() {
        let cache = MemoryBillCache::new();
        cache.cache_bills("bills:acc-3", &[], Duration::from_secs(60)).await;
        assert_eq!(cache.get_bills("bills:acc-3").await, Some(vec![]));

        cache.delete("bills:acc-3").await.unwrap();
        assert_eq!(cache.get_bills("bills:acc-3").await, None);
    }
}

//! Redis-backed [`KeyValueStore`]
//!
//! Uses a multiplexed `ConnectionManager`; cloning it is cheap and every
//! operation works on its own clone.

use crate::storage::KeyValueStore;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, ErrorKind, RedisError};
use rentshare_core::AppError;
use std::time::Duration;
use tracing::{debug, error, info};

/// Keys fetched per SCAN round trip
const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

/// PX argument for `ttl`: whole milliseconds rounded up, never 0
fn expiry_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX).max(1)
}

/// Connection-level failures become `CacheConnection`, the rest `Cache`
fn cache_error(e: RedisError) -> AppError {
    if e.is_io_error() || e.is_connection_dropped() || e.kind() == ErrorKind::IoError {
        error!("Redis connection problem: {}", e);
        AppError::CacheConnection(e.to_string())
    } else {
        error!("Redis command failed: {}", e);
        AppError::Cache(e.to_string())
    }
}

impl RedisStore {
    /// Open a managed connection to `url`
    pub async fn new(url: &str) -> Result<Self, AppError> {
        let client = Client::open(url)
            .map_err(|e| AppError::CacheConnection(format!("bad Redis URL: {}", e)))?;
        let manager = ConnectionManager::new(client).await.map_err(cache_error)?;

        info!("Redis connection manager ready");
        Ok(Self { manager })
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(cache_error)
    }
}

/// SCAN MATCH pattern for keys starting with `prefix`, glob characters
/// escaped
fn glob_escape(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('*');
    out
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(cache_error)
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        expire_after: Option<Duration>,
    ) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let result: Result<(), RedisError> = match expire_after {
            Some(ttl) => conn.pset_ex(key, value, expiry_millis(ttl)).await,
            None => conn.set(key, value).await,
        };
        result.map_err(cache_error)
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let removed: u32 = conn.del(key).await.map_err(cache_error)?;
        Ok(removed > 0)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let pattern = glob_escape(prefix);
        let mut conn = self.manager.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(cache_error)?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("SCAN {} matched {} keys", pattern, keys.len());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageCache;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_glob_escape() {
        assert_eq!(glob_escape("cache_search_"), "cache_search_*");
        assert_eq!(glob_escape("cache_q=a*b"), "cache_q=a\\*b*");
        assert_eq!(glob_escape("[x]?"), "\\[x\\]\\?*");
    }

    #[test]
    fn test_expiry_never_shorter_than_ttl() {
        assert_eq!(expiry_millis(Duration::from_millis(1_900)), 1_900);
        assert_eq!(expiry_millis(Duration::from_micros(1_500)), 2);
        assert_eq!(expiry_millis(Duration::from_nanos(1)), 1);
        assert_eq!(expiry_millis(Duration::ZERO), 1);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_storage_cache_over_redis() {
        let store = RedisStore::new("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis");
        assert!(store.ping().await.is_ok());

        let cache = StorageCache::new(Arc::new(store.clone()));
        cache
            .set("test_item", &json!({"id": 1}), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("test_item").await, Some(json!({"id": 1})));

        assert_eq!(cache.delete_prefix("test_").await, 1);
        assert_eq!(cache.get("test_item").await, None);
    }
}

//! Persistent cache over a key/value store
//!
//! Each entry is written as a JSON envelope `{"data", "timestamp", "ttl"}`
//! (timestamp and ttl in milliseconds) under `cache_<key>`. Reads check the
//! envelope's age, so expiry does not depend on the store honouring TTLs.
//!
//! The cache never fails its caller: store errors are logged and reported as
//! a miss, and entries that do not parse are deleted and reported as a miss.

use crate::keys;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rentshare_core::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Minimal string key/value store the persistent cache is built on
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `value`. `expire_after` lets the store drop the key on its own.
    async fn set(&self, key: &str, value: String, expire_after: Option<Duration>) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<bool>;

    async fn keys_with_prefix(&self, prefix: &str) -> AppResult<Vec<String>>;
}

/// Process-local [`KeyValueStore`], used in tests and when Redis is disabled
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw value, bypassing the envelope format
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.data.lock().insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String, _expire_after: Option<Duration>) -> AppResult<()> {
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.data.lock().remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        Ok(self
            .data
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Stored form of a cache entry
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    data: Value,
    /// Unix time of the write, in milliseconds
    timestamp: i64,
    /// Lifetime in milliseconds
    ttl: i64,
}

impl Envelope {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) >= self.ttl
    }

    /// Lifetime left at `now_ms`
    fn remaining(&self, now_ms: i64) -> Duration {
        let left = self.ttl.saturating_sub(now_ms.saturating_sub(self.timestamp));
        Duration::from_millis(u64::try_from(left).unwrap_or(0))
    }
}

/// TTL cache backed by a [`KeyValueStore`]
#[derive(Clone)]
pub struct StorageCache {
    store: Arc<dyn KeyValueStore>,
}

impl StorageCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Fetch a live entry. Expired and corrupt entries are deleted.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.get_with_ttl(key).await.map(|(value, _)| value)
    }

    /// Like [`get`](Self::get), also returning the entry's remaining lifetime
    pub async fn get_with_ttl(&self, key: &str) -> Option<(Value, Duration)> {
        let storage_key = keys::storage_key(key);

        let raw = match self.store.get(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Persistent cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let now = Utc::now().timestamp_millis();
        match serde_json::from_str::<Envelope>(&raw) {
            Ok(envelope) if !envelope.is_expired(now) => {
                let remaining = envelope.remaining(now);
                Some((envelope.data, remaining))
            }
            Ok(_) => {
                debug!("Persistent cache entry expired: {}", key);
                self.remove_quietly(&storage_key).await;
                None
            }
            Err(e) => {
                debug!("Dropping corrupt persistent cache entry {}: {}", key, e);
                self.remove_quietly(&storage_key).await;
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`
    pub async fn set(&self, key: &str, value: &Value, ttl: Duration) {
        let storage_key = keys::storage_key(key);

        if ttl.is_zero() {
            // an already-expired entry must not shadow an older value
            self.remove_quietly(&storage_key).await;
            return;
        }

        let envelope = Envelope {
            data: value.clone(),
            timestamp: Utc::now().timestamp_millis(),
            ttl: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        };

        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(&storage_key, raw, Some(ttl)).await {
            warn!("Persistent cache write failed for {}: {}", key, e);
        }
    }

    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(&keys::storage_key(key)).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Persistent cache delete failed for {}: {}", key, e);
                false
            }
        }
    }

    /// Remove every entry whose (un-namespaced) key starts with `prefix`
    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        let keys = match self
            .store
            .keys_with_prefix(&keys::storage_key(prefix))
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Persistent cache scan failed for prefix {}: {}", prefix, e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            if self.remove_quietly(&key).await {
                removed += 1;
            }
        }
        removed
    }

    /// Remove all cache entries from the store
    pub async fn clear(&self) -> usize {
        self.delete_prefix("").await
    }

    /// Remove expired and corrupt entries. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let keys = match self.store.keys_with_prefix(keys::STORAGE_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Persistent cache scan failed: {}", e);
                return 0;
            }
        };

        let now = Utc::now().timestamp_millis();
        let mut removed = 0;

        for key in keys {
            let stale = match self.store.get(&key).await {
                Ok(Some(raw)) => serde_json::from_str::<Envelope>(&raw)
                    .map(|env| env.is_expired(now))
                    .unwrap_or(true),
                Ok(None) => false,
                Err(e) => {
                    warn!("Persistent cache read failed for {}: {}", key, e);
                    false
                }
            };

            if stale && self.remove_quietly(&key).await {
                removed += 1;
            }
        }

        removed
    }

    /// Number of entries in the store, including expired ones
    pub async fn len(&self) -> usize {
        match self.store.keys_with_prefix(keys::STORAGE_PREFIX).await {
            Ok(keys) => keys.len(),
            Err(e) => {
                warn!("Persistent cache scan failed: {}", e);
                0
            }
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn remove_quietly(&self, storage_key: &str) -> bool {
        match self.store.delete(storage_key).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Persistent cache delete failed for {}: {}", storage_key, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentshare_core::AppError;
    use serde_json::json;

    const MINUTE: Duration = Duration::from_secs(60);

    fn cache() -> (Arc<InMemoryStore>, StorageCache) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), StorageCache::new(store))
    }

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::CacheConnection("down".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> AppResult<()> {
            Err(AppError::CacheConnection("down".to_string()))
        }

        async fn delete(&self, _key: &str) -> AppResult<bool> {
            Err(AppError::CacheConnection("down".to_string()))
        }

        async fn keys_with_prefix(&self, _prefix: &str) -> AppResult<Vec<String>> {
            Err(AppError::CacheConnection("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_round_trip_under_namespaced_key() {
        let (store, cache) = cache();
        cache.set("item_1", &json!({"title": "Drill"}), MINUTE).await;

        assert!(store.contains("cache_item_1"));
        assert_eq!(cache.get("item_1").await, Some(json!({"title": "Drill"})));
        assert!(cache.has("item_1").await);
    }

    #[tokio::test]
    async fn test_envelope_format() {
        let (store, cache) = cache();
        cache.set("k", &json!([1, 2]), MINUTE).await;

        let raw = store.get("cache_k").await.unwrap().unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["data"], json!([1, 2]));
        assert_eq!(parsed["ttl"], json!(60_000));
        assert!(parsed["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn test_remaining_lifetime_reported() {
        let (store, cache) = cache();
        let aging = json!({
            "data": "v",
            "timestamp": Utc::now().timestamp_millis() - 45_000,
            "ttl": 60_000
        });
        store.insert_raw("cache_k", &aging.to_string());

        let (value, remaining) = cache.get_with_ttl("k").await.unwrap();
        assert_eq!(value, json!("v"));
        assert!(remaining <= Duration::from_secs(15));
        assert!(remaining > Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_a_miss() {
        let (_, cache) = cache();
        cache.set("k", &json!("v"), Duration::ZERO).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_expired_envelope_removed_on_read() {
        let (store, cache) = cache();
        let stale = json!({
            "data": "old",
            "timestamp": Utc::now().timestamp_millis() - 10_000,
            "ttl": 5_000
        });
        store.insert_raw("cache_k", &stale.to_string());

        assert_eq!(cache.get("k").await, None);
        assert!(!store.contains("cache_k"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss_and_removed() {
        let (store, cache) = cache();
        store.insert_raw("cache_bad", "{not json");

        assert_eq!(cache.get("bad").await, None);
        assert!(!store.contains("cache_bad"));
    }

    #[tokio::test]
    async fn test_store_errors_are_misses() {
        let cache = StorageCache::new(Arc::new(BrokenStore));
        cache.set("k", &json!(1), MINUTE).await;
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.delete("k").await);
        assert_eq!(cache.delete_prefix("k").await, 0);
        assert_eq!(cache.cleanup().await, 0);
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_matching_keys() {
        let (store, cache) = cache();
        cache.set("search_a", &json!(1), MINUTE).await;
        cache.set("search_b", &json!(2), MINUTE).await;
        cache.set("item_1", &json!(3), MINUTE).await;
        store.insert_raw("unrelated", "x");

        assert_eq!(cache.delete_prefix("search_").await, 2);
        assert!(cache.has("item_1").await);
        assert!(store.contains("unrelated"));
    }

    #[tokio::test]
    async fn test_cleanup_and_clear() {
        let (store, cache) = cache();
        cache.set("fresh", &json!(1), MINUTE).await;
        store.insert_raw("cache_corrupt", "[");
        store.insert_raw(
            "cache_stale",
            &json!({"data": 1, "timestamp": 0, "ttl": 1}).to_string(),
        );
        store.insert_raw("unrelated", "x");

        assert_eq!(cache.cleanup().await, 2);
        assert_eq!(cache.len().await, 1);

        assert_eq!(cache.clear().await, 1);
        assert!(cache.is_empty().await);
        assert!(store.contains("unrelated"));
    }
}

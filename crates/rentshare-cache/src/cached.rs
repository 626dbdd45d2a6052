//! Two-level cached fetch
//!
//! [`CacheLayer::with_cache`] looks a key up in memory, then in the
//! persistent store, and only then calls the fetcher. A persistent hit is
//! copied into memory for whatever lifetime it has left. Fetcher errors propagate and nothing is cached.

use crate::keys;
use crate::memory::MemoryCache;
use crate::storage::StorageCache;
use rentshare_core::AppResult;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-call options for [`CacheLayer::with_cache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Entry lifetime; the layer default when `None`
    pub ttl: Option<Duration>,
    pub use_memory: bool,
    pub use_storage: bool,
    /// Skip the lookup and refetch, overwriting cached copies
    pub force_refresh: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            use_memory: true,
            use_storage: true,
            force_refresh: false,
        }
    }
}

impl FetchOptions {
    pub fn with_ttl_secs(secs: u64) -> Self {
        Self {
            ttl: Some(Duration::from_secs(secs)),
            ..Default::default()
        }
    }

    pub fn memory_only(mut self) -> Self {
        self.use_storage = false;
        self
    }

    pub fn refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// Memory cache plus optional persistent cache
pub struct CacheLayer {
    memory: Arc<MemoryCache>,
    storage: Option<StorageCache>,
    default_ttl: Duration,
}

impl CacheLayer {
    pub fn new(memory: Arc<MemoryCache>, storage: Option<StorageCache>, default_ttl: Duration) -> Self {
        Self {
            memory,
            storage,
            default_ttl,
        }
    }

    /// Memory-only layer
    pub fn in_memory(max_entries: usize, default_ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCache::new(max_entries)), None, default_ttl)
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn storage(&self) -> Option<&StorageCache> {
        self.storage.as_ref()
    }

    /// Return the cached value for `key`, or fetch, cache and return it
    pub async fn with_cache<T, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        options: FetchOptions,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let storage = self.storage.as_ref().filter(|_| options.use_storage);

        if !options.force_refresh {
            if options.use_memory {
                if let Some(value) = self.memory.get(key) {
                    match serde_json::from_value::<T>(value) {
                        Ok(hit) => {
                            debug!("Cache HIT (memory): {}", key);
                            return Ok(hit);
                        }
                        Err(e) => {
                            warn!("Discarding undecodable memory entry {}: {}", key, e);
                            self.memory.delete(key);
                        }
                    }
                }
            }

            if let Some(storage) = storage {
                if let Some((value, remaining)) = storage.get_with_ttl(key).await {
                    match serde_json::from_value::<T>(value.clone()) {
                        Ok(hit) => {
                            debug!("Cache HIT (storage): {}", key);
                            if options.use_memory {
                                self.memory.set(key, value, remaining.min(ttl));
                            }
                            return Ok(hit);
                        }
                        Err(e) => {
                            warn!("Discarding undecodable stored entry {}: {}", key, e);
                            storage.delete(key).await;
                        }
                    }
                }
            }
        }

        debug!("Cache MISS: {}", key);
        let fresh = fetcher().await?;

        match serde_json::to_value(&fresh) {
            Ok(value) => {
                if let Some(storage) = storage {
                    storage.set(key, &value, ttl).await;
                }
                if options.use_memory {
                    self.memory.set(key, value, ttl);
                }
            }
            Err(e) => warn!("Not caching {}: {}", key, e),
        }

        Ok(fresh)
    }

    /// Drop one key from both levels
    pub async fn invalidate(&self, key: &str) {
        self.memory.delete(key);
        if let Some(storage) = &self.storage {
            storage.delete(key).await;
        }
    }

    /// Drop every key starting with `prefix` from both levels
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut removed = self.memory.delete_prefix(prefix);
        if let Some(storage) = &self.storage {
            removed += storage.delete_prefix(prefix).await;
        }
        debug!("Invalidated {} cache entries with prefix {}", removed, prefix);
        removed
    }

    /// Drop everything cached about an item, and every search page
    pub async fn invalidate_item(&self, item_id: Uuid) {
        self.invalidate_prefix(&keys::item_key(item_id)).await;
        self.invalidate_prefix(keys::SEARCH_PREFIX).await;
    }

    /// Drop every cached search page
    pub async fn invalidate_searches(&self) {
        self.invalidate_prefix(keys::SEARCH_PREFIX).await;
    }

    /// Drop everything cached about a user
    pub async fn invalidate_user(&self, user_id: Uuid) {
        self.invalidate_prefix(&keys::user_key(user_id)).await;
    }

    /// Sweep expired entries from both levels
    pub async fn cleanup(&self) -> (usize, usize) {
        let memory = self.memory.cleanup();
        let storage = match &self.storage {
            Some(storage) => storage.cleanup().await,
            None => 0,
        };
        (memory, storage)
    }

    pub async fn clear(&self) {
        self.memory.clear();
        if let Some(storage) = &self.storage {
            storage.clear().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use chrono::Utc;
    use rentshare_core::AppError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn layer() -> (Arc<InMemoryStore>, CacheLayer) {
        let store = Arc::new(InMemoryStore::new());
        let layer = CacheLayer::new(
            Arc::new(MemoryCache::new(10)),
            Some(StorageCache::new(store.clone())),
            Duration::from_secs(60),
        );
        (store, layer)
    }

    async fn counted(calls: &AtomicUsize, value: u32) -> AppResult<u32> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_second_read_served_from_cache() {
        let (_, cache) = layer();
        let calls = AtomicUsize::new(0);

        let a: u32 = cache
            .with_cache("k", || counted(&calls, 7), FetchOptions::default())
            .await
            .unwrap();
        let b: u32 = cache
            .with_cache("k", || counted(&calls, 8), FetchOptions::default())
            .await
            .unwrap();

        assert_eq!((a, b), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_refetches_and_overwrites() {
        let (_, cache) = layer();
        let calls = AtomicUsize::new(0);

        let _: u32 = cache
            .with_cache("k", || counted(&calls, 1), FetchOptions::default())
            .await
            .unwrap();
        let refreshed: u32 = cache
            .with_cache("k", || counted(&calls, 2), FetchOptions::default().refresh())
            .await
            .unwrap();
        let cached: u32 = cache
            .with_cache("k", || counted(&calls, 3), FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(refreshed, 2);
        assert_eq!(cached, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_storage_hit_promoted_to_memory() {
        let (_, cache) = layer();
        cache
            .storage()
            .unwrap()
            .set("k", &json!(5), Duration::from_secs(60))
            .await;
        assert!(!cache.memory().has("k"));

        let calls = AtomicUsize::new(0);
        let value: u32 = cache
            .with_cache("k", || counted(&calls, 9), FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.memory().get("k"), Some(json!(5)));
    }

    #[tokio::test]
    async fn test_promoted_entry_keeps_stored_expiry() {
        let (store, cache) = layer();
        let nearly_expired = json!({
            "data": 5,
            "timestamp": Utc::now().timestamp_millis() - 59_700,
            "ttl": 60_000
        });
        store.insert_raw("cache_k", &nearly_expired.to_string());

        let calls = AtomicUsize::new(0);
        let value: u32 = cache
            .with_cache("k", || counted(&calls, 9), FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!cache.memory().has("k"));
    }

    #[tokio::test]
    async fn test_fetcher_error_propagates_and_caches_nothing() {
        let (store, cache) = layer();

        let result: AppResult<u32> = cache
            .with_cache(
                "k",
                || async { Err(AppError::Database("boom".to_string())) },
                FetchOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(cache.memory().is_empty());
        assert!(!store.contains("cache_k"));
    }

    #[tokio::test]
    async fn test_layer_flags_respected() {
        let (store, cache) = layer();
        let calls = AtomicUsize::new(0);

        let _: u32 = cache
            .with_cache("k", || counted(&calls, 1), FetchOptions::default().memory_only())
            .await
            .unwrap();
        assert!(cache.memory().has("k"));
        assert!(!store.contains("cache_k"));

        let storage_only = FetchOptions {
            use_memory: false,
            ..Default::default()
        };
        let _: u32 = cache
            .with_cache("s", || counted(&calls, 1), storage_only)
            .await
            .unwrap();
        assert!(!cache.memory().has("s"));
        assert!(store.contains("cache_s"));
    }

    #[tokio::test]
    async fn test_invalidate_prefix_removes_only_matching_keys() {
        let (_, cache) = layer();
        let calls = AtomicUsize::new(0);
        for key in ["search_a", "search_b", "item_x"] {
            let _: u32 = cache
                .with_cache(key, || counted(&calls, 1), FetchOptions::default())
                .await
                .unwrap();
        }

        // two keys in each level
        assert_eq!(cache.invalidate_prefix("search_").await, 4);
        assert!(!cache.memory().has("search_a"));
        assert!(!cache.storage().unwrap().has("search_b").await);
        assert!(cache.memory().has("item_x"));
        assert!(cache.storage().unwrap().has("item_x").await);
    }

    #[tokio::test]
    async fn test_invalidate_item_clears_searches() {
        let (_, cache) = layer();
        let id = Uuid::new_v4();
        let calls = AtomicUsize::new(0);
        for key in [keys::item_key(id), keys::item_reviews_key(id), "search_x".to_string()] {
            let _: u32 = cache
                .with_cache(&key, || counted(&calls, 1), FetchOptions::default())
                .await
                .unwrap();
        }

        cache.invalidate_item(id).await;
        assert!(cache.memory().is_empty());
        assert!(cache.storage().unwrap().is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_serves_cached_value() {
        let (_, cache) = layer();
        let calls = AtomicUsize::new(0);
        let opts = FetchOptions {
            ttl: Some(Duration::ZERO),
            ..Default::default()
        };

        let _: u32 = cache.with_cache("k", || counted(&calls, 1), opts).await.unwrap();
        let _: u32 = cache.with_cache("k", || counted(&calls, 1), opts).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

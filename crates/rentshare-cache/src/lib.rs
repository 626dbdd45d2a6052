//! Caching layer for RentShare
//!
//! Two cache levels sit in front of the database:
//!
//! - [`MemoryCache`]: a bounded in-process map with per-entry TTLs. When full,
//!   the oldest inserted key is evicted (insertion order, not LRU).
//! - [`StorageCache`]: the same contract over a persistent [`KeyValueStore`]
//!   (Redis in production, [`InMemoryStore`] in tests). Entries are JSON
//!   envelopes `{data, timestamp, ttl}` under `cache_<key>`.
//!
//! [`CacheLayer::with_cache`] combines both around a fetcher, and
//! [`spawn_sweeper`] purges expired entries periodically.
//!
//! # Example
//!
//! ```no_run
//! use rentshare_cache::{CacheLayer, FetchOptions, MemoryCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> rentshare_core::AppResult<()> {
//! let cache = CacheLayer::new(Arc::new(MemoryCache::new(100)), None, Duration::from_secs(300));
//!
//! let answer: u32 = cache
//!     .with_cache("answer", || async { Ok(42) }, FetchOptions::default())
//!     .await?;
//! assert_eq!(answer, 42);
//! # Ok(())
//! # }
//! ```

pub mod cached;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod storage;
pub mod sweeper;

pub use cached::{CacheLayer, FetchOptions};
pub use memory::MemoryCache;
pub use redis_store::RedisStore;
pub use storage::{InMemoryStore, KeyValueStore, StorageCache};
pub use sweeper::spawn_sweeper;

//! Background expiry sweep

use crate::cached::CacheLayer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Periodically remove expired entries from both cache levels
pub fn spawn_sweeper(cache: Arc<CacheLayer>, every: Duration) -> JoinHandle<()> {
    info!("Cache sweeper running every {:?}", every);

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let (memory, storage) = cache.cleanup().await;
            if memory + storage > 0 {
                debug!(
                    "Cache sweep removed {} memory and {} stored entries",
                    memory, storage
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = Arc::new(CacheLayer::in_memory(10, Duration::from_secs(60)));
        cache.memory().set("stale", json!(1), Duration::ZERO);
        cache.memory().set("fresh", json!(2), Duration::from_secs(60));
        assert_eq!(cache.memory().len(), 2);

        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert_eq!(cache.memory().len(), 1);
        assert!(cache.memory().has("fresh"));
    }
}

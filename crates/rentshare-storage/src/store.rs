//! Object store abstraction

use crate::upload::Bucket;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rentshare_core::AppResult;
use std::collections::HashMap;

/// Blob store addressed by bucket and path
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: Bucket, path: &str, data: Bytes, content_type: &str) -> AppResult<()>;

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, bucket: Bucket, path: &str) -> AppResult<()>;
}

/// Process-local object store for tests and local development
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(Bucket, String), (Bytes, String)>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes and content type
    pub fn get(&self, bucket: Bucket, path: &str) -> Option<(Bytes, String)> {
        self.objects.lock().get(&(bucket, path.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, bucket: Bucket, path: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        self.objects
            .lock()
            .insert((bucket, path.to_string()), (data, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, bucket: Bucket, path: &str) -> AppResult<()> {
        self.objects.lock().remove(&(bucket, path.to_string()));
        Ok(())
    }
}

//! File uploads for RentShare
//!
//! Item photos and avatars go to an S3-compatible object store. Uploads are
//! validated (image types only, per-bucket size limit) before any bytes are
//! sent, and stored under `<owner>/<uuid>.<ext>`.

pub mod s3_store;
pub mod store;
pub mod upload;

pub use s3_store::S3ObjectStore;
pub use store::{InMemoryObjectStore, ObjectStore};
pub use upload::{Bucket, StoredObject};

use bytes::Bytes;
use rentshare_core::AppResult;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Validating front end to an [`ObjectStore`]
#[derive(Clone)]
pub struct FileStorage {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl FileStorage {
    pub fn new(store: Arc<dyn ObjectStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into(),
        }
    }

    /// Validate and store a file owned by `owner_id`
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload(
        &self,
        bucket: Bucket,
        owner_id: Uuid,
        content_type: &str,
        data: Bytes,
    ) -> AppResult<StoredObject> {
        let ext = upload::validate_upload(bucket, content_type, data.len())?;
        let path = upload::object_path(owner_id, ext);
        let size = data.len();

        self.store.put(bucket, &path, data, content_type).await?;
        debug!("Uploaded {}/{}", bucket, path);

        Ok(StoredObject {
            bucket,
            url: upload::public_url(&self.public_base_url, bucket, &path),
            path,
            content_type: content_type.to_string(),
            size,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, bucket: Bucket, path: &str) -> AppResult<()> {
        self.store.delete(bucket, path).await
    }

    /// Delete an object, logging instead of failing. For cleanup after the
    /// owning database row is already gone.
    pub async fn delete_quietly(&self, bucket: Bucket, path: &str) {
        if let Err(e) = self.store.delete(bucket, path).await {
            warn!("Orphaned object {}/{}: {}", bucket, path, e);
        }
    }

    /// Object path of a public URL this storage produced
    pub fn path_from_url(&self, bucket: Bucket, url: &str) -> Option<String> {
        let prefix = upload::public_url(&self.public_base_url, bucket, "");
        url.strip_prefix(&prefix)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentshare_core::AppError;

    fn storage() -> (Arc<InMemoryObjectStore>, FileStorage) {
        let store = Arc::new(InMemoryObjectStore::new());
        (store.clone(), FileStorage::new(store, "https://files.example.com"))
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_builds_url() {
        let (store, files) = storage();
        let owner = Uuid::new_v4();

        let stored = files
            .upload(Bucket::ItemImages, owner, "image/png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();

        assert!(stored.path.starts_with(&owner.to_string()));
        assert!(stored.path.ends_with(".png"));
        assert_eq!(
            stored.url,
            format!("https://files.example.com/item-images/{}", stored.path)
        );
        let (bytes, content_type) = store.get(Bucket::ItemImages, &stored.path).unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(content_type, "image/png");

        assert_eq!(
            files.path_from_url(Bucket::ItemImages, &stored.url),
            Some(stored.path.clone())
        );
        assert_eq!(files.path_from_url(Bucket::Avatars, &stored.url), None);
    }

    #[tokio::test]
    async fn test_rejected_upload_stores_nothing() {
        let (store, files) = storage();
        let big = Bytes::from(vec![0u8; Bucket::Avatars.max_bytes() + 1]);

        let err = files
            .upload(Bucket::Avatars, Uuid::new_v4(), "image/jpeg", big)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { .. }));

        let err = files
            .upload(Bucket::Avatars, Uuid::new_v4(), "application/zip", Bytes::from_static(b"PK"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, files) = storage();
        let stored = files
            .upload(Bucket::Avatars, Uuid::new_v4(), "image/gif", Bytes::from_static(b"GIF8"))
            .await
            .unwrap();

        files.delete(Bucket::Avatars, &stored.path).await.unwrap();
        assert!(store.is_empty());
    }
}

//! S3-compatible [`ObjectStore`] backed by `rust-s3`

use crate::store::ObjectStore;
use crate::upload::Bucket;
use async_trait::async_trait;
use bytes::Bytes;
use rentshare_core::config::StorageConfig;
use rentshare_core::{AppError, AppResult};
use s3::creds::Credentials;
use s3::Region;
use std::collections::HashMap;
use tracing::{error, info};

pub struct S3ObjectStore {
    buckets: HashMap<Bucket, Box<s3::Bucket>>,
}

impl S3ObjectStore {
    /// Build handles for every bucket. No network traffic happens here.
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Config(format!("Object storage credentials error: {}", e)))?;

        let mut buckets = HashMap::new();
        for bucket in Bucket::ALL {
            let handle = s3::Bucket::new(bucket.name(), region.clone(), credentials.clone())
                .map_err(|e| AppError::Config(format!("Bucket {} error: {}", bucket, e)))?
                .with_path_style();
            buckets.insert(bucket, handle);
        }

        info!("Object storage configured at {}", config.endpoint);
        Ok(Self { buckets })
    }

    fn handle(&self, bucket: Bucket) -> AppResult<&s3::Bucket> {
        self.buckets
            .get(&bucket)
            .map(|b| b.as_ref())
            .ok_or_else(|| AppError::Storage(format!("Bucket {} not configured", bucket)))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, bucket: Bucket, path: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        self.handle(bucket)?
            .put_object_with_content_type(path, &data, content_type)
            .await
            .map_err(|e| {
                error!("Upload to {}/{} failed: {}", bucket, path, e);
                AppError::Storage(format!("Upload failed: {}", e))
            })?;

        info!("Stored {}/{} ({} bytes)", bucket, path, data.len());
        Ok(())
    }

    async fn delete(&self, bucket: Bucket, path: &str) -> AppResult<()> {
        self.handle(bucket)?.delete_object(path).await.map_err(|e| {
            error!("Delete of {}/{} failed: {}", bucket, path, e);
            AppError::Storage(format!("Delete failed: {}", e))
        })?;

        info!("Deleted {}/{}", bucket, path);
        Ok(())
    }
}

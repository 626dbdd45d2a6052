//! Upload rules: buckets, accepted image types, size limits and naming

use rentshare_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const MB: usize = 1024 * 1024;

/// Storage buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    ItemImages,
    Avatars,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::ItemImages, Bucket::Avatars];

    pub fn name(&self) -> &'static str {
        match self {
            Bucket::ItemImages => "item-images",
            Bucket::Avatars => "avatars",
        }
    }

    /// Largest accepted file, in bytes
    pub fn max_bytes(&self) -> usize {
        match self {
            Bucket::ItemImages => 5 * MB,
            Bucket::Avatars => 2 * MB,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepted MIME types and the extension stored objects get
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// File extension for an accepted content type
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// Check type and size for `bucket`; returns the extension to store under
pub fn validate_upload(bucket: Bucket, content_type: &str, size: usize) -> AppResult<&'static str> {
    let ext = extension_for(content_type)
        .ok_or_else(|| AppError::UnsupportedMediaType(content_type.to_string()))?;

    if size == 0 {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if size > bucket.max_bytes() {
        return Err(AppError::PayloadTooLarge {
            size,
            max: bucket.max_bytes(),
        });
    }

    Ok(ext)
}

/// `<owner>/<random uuid>.<ext>`
pub fn object_path(owner_id: Uuid, ext: &str) -> String {
    format!("{}/{}.{}", owner_id, Uuid::new_v4(), ext)
}

/// `<base>/<bucket>/<path>`, tolerating a trailing slash on `base`
pub fn public_url(base: &str, bucket: Bucket, path: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, path)
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub bucket: Bucket,
    pub path: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_types() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp; charset=binary"), Some("webp"));
        assert_eq!(extension_for("image/svg+xml"), None);
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[test]
    fn test_size_limits_per_bucket() {
        assert_eq!(validate_upload(Bucket::ItemImages, "image/png", 5 * MB).unwrap(), "png");
        assert!(matches!(
            validate_upload(Bucket::ItemImages, "image/png", 5 * MB + 1),
            Err(AppError::PayloadTooLarge { max, .. }) if max == 5 * MB
        ));

        assert!(validate_upload(Bucket::Avatars, "image/gif", 2 * MB).is_ok());
        assert!(matches!(
            validate_upload(Bucket::Avatars, "image/gif", 3 * MB),
            Err(AppError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_non_images_and_empty_files() {
        assert!(matches!(
            validate_upload(Bucket::Avatars, "text/html", 10),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            validate_upload(Bucket::Avatars, "image/jpeg", 0),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_path_and_url() {
        let owner = Uuid::new_v4();
        let path = object_path(owner, "jpg");
        assert!(path.starts_with(&format!("{}/", owner)));
        assert!(path.ends_with(".jpg"));

        assert_eq!(
            public_url("https://cdn.example.com/", Bucket::Avatars, "a/b.png"),
            "https://cdn.example.com/avatars/a/b.png"
        );
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(Bucket::from_name("item-images"), Some(Bucket::ItemImages));
        assert_eq!(Bucket::from_name("docs"), None);
    }
}

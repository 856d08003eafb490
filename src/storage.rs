//! File storage buckets
//!
//! Named buckets rooted on local disk, exposed through a public base URL.
//! Object paths are generated client-side style: timestamp, random suffix,
//! original extension. Content types are not inspected.

use crate::config::StorageConfig;
use crate::error::AppError;
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

static OBJECT_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+(/[A-Za-z0-9._-]+)*$").expect("valid regex"));

/// Result of an upload
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub public_url: String,
    pub size: usize,
}

pub struct BucketStorage {
    root: PathBuf,
    public_base_url: String,
    buckets: Vec<String>,
}

impl BucketStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            public_base_url: config.public_base_url.clone(),
            buckets: config.buckets.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    fn check_bucket(&self, bucket: &str) -> Result<(), AppError> {
        if self.buckets.iter().any(|b| b == bucket) {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!("Unknown storage bucket '{}'", bucket)))
        }
    }

    fn check_path(path: &str) -> Result<(), AppError> {
        if !OBJECT_PATH.is_match(path) || path.split('/').any(|s| s == "." || s == "..") {
            return Err(AppError::BadRequest(format!("Invalid object path '{}'", path)));
        }
        Ok(())
    }

    /// Write an object into a bucket
    pub async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<StoredObject, AppError> {
        self.check_bucket(bucket)?;
        Self::check_path(path)?;

        let target = self.root.join(bucket).join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        info!("Stored {}/{} ({} bytes)", bucket, path, bytes.len());

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: self.public_url(bucket, path)?,
            size: bytes.len(),
        })
    }

    /// Public URL of an object; does not check that it exists
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<String, AppError> {
        self.check_bucket(bucket)?;
        Self::check_path(path)?;
        Ok(format!("{}/{}/{}", self.public_base_url, bucket, path))
    }
}

/// `<unix-millis>-<random>.<ext>` for an uploaded file name
pub fn object_path(original_name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    let stem = format!("{}-{}", Utc::now().timestamp_millis(), suffix);

    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: PathBuf) -> BucketStorage {
        BucketStorage::new(&StorageConfig {
            root,
            public_base_url: "https://cdn.example.com/storage".to_string(),
            buckets: vec!["center-media".to_string()],
        })
    }

    #[test]
    fn test_object_path_shape() {
        let path = object_path("Sunset Over Dunes.JPG");
        assert!(path.ends_with(".jpg"));
        let stem = path.trim_end_matches(".jpg");
        let (millis, suffix) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 6);

        assert!(!object_path("README").contains('.'));
        assert!(BucketStorage::check_path(&object_path("clip.mp4")).is_ok());
    }

    #[test]
    fn test_public_url_and_validation() {
        let storage = storage(PathBuf::from("/tmp/unused"));
        assert_eq!(
            storage.public_url("center-media", "2024/a.png").unwrap(),
            "https://cdn.example.com/storage/center-media/2024/a.png"
        );
        assert!(storage.public_url("secrets", "a.png").is_err());
        assert!(storage.public_url("center-media", "../etc/passwd").is_err());
        assert!(storage.public_url("center-media", "/abs.png").is_err());
    }

    #[test]
    fn test_upload_rejects_unknown_bucket() {
        let storage = storage(PathBuf::from("/tmp/unused"));
        let result = tokio_test::block_on(storage.upload("secrets", "a.png", b"x"));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_upload_writes_file() {
        let root = std::env::temp_dir().join(format!("wanderlust-storage-{}", uuid::Uuid::new_v4()));
        let storage = storage(root.clone());

        let stored = storage.upload("center-media", "centers/photo.png", b"png-bytes").await.unwrap();
        assert_eq!(stored.size, 9);
        let written = tokio::fs::read(root.join("center-media/centers/photo.png")).await.unwrap();
        assert_eq!(written, b"png-bytes");

        let _ = tokio::fs::remove_dir_all(root).await;
    }
}

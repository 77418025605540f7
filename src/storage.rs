//! Public object storage for rendered design images.
//!
//! Objects live in the `wristband-designs` bucket, a directory under the storage
//! root that the HTTP server exposes at `/storage/wristband-designs`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const DESIGN_BUCKET: &str = "wristband-designs";

const PNG_DATA_PREFIX: &str = "data:image/png;base64,";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("image must be a base64 PNG data URL")]
    InvalidDataUrl,

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `key` in `bucket` and returns its public URL.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String, ObjectStoreError>;
}

/// Decodes a `data:image/png;base64,...` URL into PNG bytes.
pub fn decode_png_data_url(data_url: &str) -> Result<Vec<u8>, ObjectStoreError> {
    let encoded = data_url.trim().strip_prefix(PNG_DATA_PREFIX).ok_or(ObjectStoreError::InvalidDataUrl)?;
    let bytes = BASE64.decode(encoded).map_err(|_| ObjectStoreError::InvalidDataUrl)?;
    if !bytes.starts_with(PNG_MAGIC) {
        return Err(ObjectStoreError::InvalidDataUrl);
    }
    Ok(bytes)
}

/// `<owner>/<unix-millis>-<uuid>.png`, unique even for uploads in the same millisecond.
pub fn design_key(owner: Uuid) -> String {
    format!("{owner}/{}-{}.png", chrono::Utc::now().timestamp_millis(), Uuid::now_v7().simple())
}

fn checked(key: &str) -> Result<&Path, ObjectStoreError> {
    let path = Path::new(key);
    if key.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(path)
}

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self { root: root.into(), public_base_url: public_base_url.trim_end_matches('/').to_string() }
    }


    pub fn bucket_dir(&self, bucket: &str) -> PathBuf { self.root.join(bucket) }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String, ObjectStoreError> {
        checked(bucket)?;
        let relative = checked(key)?;
        let path = self.bucket_dir(bucket).join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), "stored object");
        Ok(format!("{}/storage/{bucket}/{key}", self.public_base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_data_url() -> String {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(b"rest-of-image");
        format!("{PNG_DATA_PREFIX}{}", BASE64.encode(bytes))
    }

    #[test]
    fn test_decode_data_url() {
        assert!(decode_png_data_url(&png_data_url()).unwrap().starts_with(PNG_MAGIC));
        assert!(decode_png_data_url("data:image/jpeg;base64,AAAA").is_err());
        assert!(decode_png_data_url("data:image/png;base64,!!!").is_err());
        assert!(decode_png_data_url(&format!("{PNG_DATA_PREFIX}{}", BASE64.encode(b"not a png"))).is_err());
    }

    #[tokio::test]
    async fn test_put_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "http://localhost:8083/");
        let owner = Uuid::now_v7();
        let key = format!("{owner}/1.png");
        let url = store.put(DESIGN_BUCKET, &key, b"png".to_vec()).await.unwrap();
        assert_eq!(url, format!("http://localhost:8083/storage/wristband-designs/{key}"));
        let written = tokio::fs::read(dir.path().join(DESIGN_BUCKET).join(&key)).await.unwrap();
        assert_eq!(written, b"png");
    }

    #[test]
    fn test_design_keys_are_unique() {
        let owner = Uuid::now_v7();
        let keys: std::collections::HashSet<String> = (0..100).map(|_| design_key(owner)).collect();
        assert_eq!(keys.len(), 100);
        assert!(keys.iter().all(|k| k.starts_with(&format!("{owner}/")) && k.ends_with(".png")));
        assert!(keys.iter().all(|k| checked(k).is_ok()));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "http://localhost");
        assert!(matches!(store.put(DESIGN_BUCKET, "../escape.png", vec![]).await, Err(ObjectStoreError::InvalidKey(_))));
        assert!(matches!(store.put(DESIGN_BUCKET, "/abs.png", vec![]).await, Err(ObjectStoreError::InvalidKey(_))));
    }
}

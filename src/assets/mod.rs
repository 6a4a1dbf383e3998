//! Content-addressed asset store
//!
//! Binary assets (images, documents) are stored under a key derived from the
//! SHA-256 of their bytes, sharded by the hash prefix, so identical content
//! is stored once. A blake3 checksum stored with each object's metadata acts
//! as a cheap existence check: uploads are skipped when the destination
//! already holds matching content, making reruns idempotent and cheap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Metadata stored alongside each object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetMeta {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMeta {
    checksum: String,
    #[serde(flatten)]
    meta: AssetMeta,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Content-addressed object storage seam
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store the file's bytes, returning the content hash that keys them.
    async fn put(&self, path: &Path, meta: AssetMeta) -> Result<String, AssetError>;
}

/// Filesystem-backed store; the object-storage service itself is external,
/// this implementation mirrors its key scheme on local disk.
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Destination key sharded by the first two bytes of the hash
    fn object_path(&self, hash: &str) -> PathBuf {
        self.root.join(&hash[..2]).join(&hash[2..4]).join(hash)
    }

    fn meta_path(&self, hash: &str) -> PathBuf {
        let mut p = self.object_path(hash).into_os_string();
        p.push(".meta.json");
        PathBuf::from(p)
    }

    async fn existing_checksum(&self, hash: &str) -> Option<String> {
        if !self.object_path(hash).exists() {
            return None;
        }
        let json = tokio::fs::read_to_string(self.meta_path(hash)).await.ok()?;
        let stored: StoredMeta = serde_json::from_str(&json).ok()?;
        Some(stored.checksum)
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn put(&self, path: &Path, meta: AssetMeta) -> Result<String, AssetError> {
        let bytes = tokio::fs::read(path).await?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let hash = hex::encode(hasher.finalize());
        let checksum = blake3::hash(&bytes).to_hex().to_string();

        if self.existing_checksum(&hash).await.as_deref() == Some(checksum.as_str()) {
            debug!(key = %hash, "Asset already stored, skipping upload");
            return Ok(hash);
        }

        let dest = self.object_path(&hash);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, &bytes).await?;
        let stored = StoredMeta { checksum, meta };
        tokio::fs::write(self.meta_path(&hash), serde_json::to_vec_pretty(&stored)?)
            .await?;

        info!(key = %hash, size = bytes.len(), "Stored asset");
        Ok(hash)
    }
}

//! Storage backends for cache entries.
//!
//! One trait, two implementations: an S3-compatible object store and a local
//! directory tree. The concrete backend is chosen once at startup from
//! `StorageConfig`; nothing downstream branches on backend kind.

mod filesystem;
mod object_store;
mod retry;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::cache::entry::{EntryMetadata, StoredObject};
use crate::config::{BackendKind, StorageConfig};
use crate::retry::RetryPolicy;

pub use filesystem::FilesystemBackend;
pub use object_store::ObjectStoreBackend;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Network, auth, permission or disk failure after retries were exhausted.
    #[error("{backend} backend unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
}

impl StorageError {
    pub fn unavailable(backend: &str, reason: impl Into<String>) -> Self {
        StorageError::Unavailable {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }
}

/// Keyed blob storage. Implementations must be safe for concurrent use on
/// different keys. A missing key is `Ok(None)` / `Ok(false)`, never an error.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    /// Writes a complete payload. Readers never observe a partial write.
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        metadata: &EntryMetadata,
    ) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Reads only the metadata of an entry.
    async fn metadata(&self, key: &str) -> Result<Option<EntryMetadata>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Constructs the backend for `kind` from configuration.
pub async fn build_backend(
    kind: BackendKind,
    config: &StorageConfig,
) -> Result<Arc<dyn StorageBackend>> {
    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        timeout: config.timeout,
        ..RetryPolicy::default()
    };
    match kind {
        BackendKind::Filesystem => {
            info!("Using filesystem cache backend at {}", config.cache_dir.display());
            Ok(Arc::new(FilesystemBackend::new(
                config.cache_dir.clone(),
                config.timeout,
            )))
        }
        BackendKind::ObjectStore => {
            let s3 = config
                .s3
                .as_ref()
                .context("object store backend selected but S3 settings are missing")?;
            let backend = ObjectStoreBackend::connect(s3, policy).await;
            info!("Using object store cache backend (bucket: {})", s3.bucket);
            Ok(Arc::new(backend))
        }
    }
}

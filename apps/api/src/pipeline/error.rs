use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the extraction and derivation pipeline.
///
/// Only `EmptyInput`, `Extraction` and fully-unreachable storage reach HTTP
/// callers; the rest are absorbed into cache misses or heuristic fallbacks.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot fingerprint an empty document")]
    EmptyInput,

    #[error("storage backend '{backend}' unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("malformed cache entry at '{key}': {reason}")]
    MalformedCacheEntry { key: String, reason: String },

    #[error("upstream collaborator failed: {0}")]
    UpstreamCollaborator(String),

    #[error("document extraction failed: {0}")]
    Extraction(String),

    #[error("no artifacts stored for document {0}")]
    UnknownDocument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable { backend, reason } => {
                PipelineError::BackendUnavailable { backend, reason }
            }
            StorageError::InvalidKey(key) => PipelineError::BackendUnavailable {
                backend: "storage".to_string(),
                reason: format!("invalid key '{key}'"),
            },
        }
    }
}

use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use super::{StorageBackend, StorageError};
use crate::cache::entry::{EntryMetadata, StoredObject};

const BACKEND_NAME: &str = "filesystem";
const METADATA_SUFFIX: &str = ".meta.json";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Cache entries stored as files under a root directory.
///
/// Payload lives at `<root>/<key>`, metadata in a `<key>.meta.json` sidecar.
/// Writes go to a temp file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    root: PathBuf,
    timeout: Duration,
}

impl FilesystemBackend {
    pub fn new(root: PathBuf, timeout: Duration) -> Self {
        Self { root, timeout }
    }

    fn payload_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn metadata_path(payload: &Path) -> PathBuf {
        let mut name = payload.as_os_str().to_owned();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }

    async fn bounded<T, Fut>(&self, operation: &str, fut: Fut) -> Result<T, StorageError>
    where
        Fut: Future<Output = io::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StorageError::unavailable(
                BACKEND_NAME,
                format!("{operation}: {e}"),
            )),
            Err(_) => Err(StorageError::unavailable(
                BACKEND_NAME,
                format!("{operation}: timed out after {}ms", self.timeout.as_millis()),
            )),
        }
    }
}

/// Writes `bytes` to `path` via a uniquely named sibling temp file and rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".tmp-{}-{n}", std::process::id()));
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

async fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn remove_optional(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn parse_metadata(raw: Option<Vec<u8>>, path: &Path) -> Option<EntryMetadata> {
    let raw = raw?;
    match serde_json::from_slice(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unreadable metadata sidecar");
            None
        }
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
        metadata: &EntryMetadata,
    ) -> Result<(), StorageError> {
        let path = self.payload_path(key)?;
        let meta_path = Self::metadata_path(&path);
        let meta_bytes = serde_json::to_vec_pretty(metadata)
            .map_err(|e| StorageError::unavailable(BACKEND_NAME, e.to_string()))?;

        self.bounded("put", async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            // Sidecar first: a reader that sees the new payload also sees its checksum.
            write_atomic(&meta_path, &meta_bytes).await?;
            write_atomic(&path, &bytes).await
        })
        .await?;

        debug!(key, size = bytes.len(), "Wrote cache entry to filesystem");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = self.payload_path(key)?;
        let meta_path = Self::metadata_path(&path);

        let read = self
            .bounded("get", async {
                let Some(payload) = read_optional(&path).await? else {
                    return Ok(None);
                };
                let meta = read_optional(&meta_path).await?;
                Ok(Some((payload, meta)))
            })
            .await?;

        Ok(read.map(|(payload, meta)| StoredObject {
            bytes: Bytes::from(payload),
            metadata: parse_metadata(meta, &meta_path),
        }))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.payload_path(key)?;
        self.bounded("exists", fs::try_exists(&path)).await
    }

    async fn metadata(&self, key: &str) -> Result<Option<EntryMetadata>, StorageError> {
        let path = self.payload_path(key)?;
        let meta_path = Self::metadata_path(&path);
        let raw = self.bounded("metadata", read_optional(&meta_path)).await?;
        Ok(parse_metadata(raw, &meta_path))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.payload_path(key)?;
        let meta_path = Self::metadata_path(&path);
        self.bounded("delete", async {
            remove_optional(&path).await?;
            remove_optional(&meta_path).await
        })
        .await
    }
}

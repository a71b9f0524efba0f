//! Extraction cache: cache-aside storage of derived artifacts keyed by
//! (content fingerprint, artifact kind).
//!
//! # Guarantees
//! - A hit returns the stored payload unchanged; the compute function is not called.
//! - A failed computation is returned to the caller and never written.
//! - Concurrent callers for the same key in this process share one computation.
//! - Persistence is best-effort: the computed value is returned even if every
//!   backend rejects the write (the failure is reported on `Cached::persist_error`).
//! - A payload whose checksum or decoding fails is treated as a miss and is
//!   overwritten by the next successful write.

pub mod entry;
pub mod inflight;
pub mod key;

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::fingerprint::ContentFingerprint;
use crate::pipeline::PipelineError;
use crate::storage::StorageBackend;

pub use entry::{Artifact, ArtifactSource, Computed, EntryMetadata};
pub use key::{ArtifactKind, CacheKey};

use inflight::InflightRegistry;

/// Result of a settled lookup-or-compute, shared with coalesced waiters.
#[derive(Debug, Clone)]
struct Settled {
    payload: Bytes,
    metadata: EntryMetadata,
    hit: bool,
    stored_in: Option<String>,
    persist_error: Option<String>,
}

/// A verified entry read from one backend.
struct Found {
    payload: Bytes,
    metadata: EntryMetadata,
    backend: String,
}

/// An artifact returned by the cache together with how it was obtained.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cached<T> {
    pub value: T,
    pub metadata: EntryMetadata,
    /// Served from storage without running the compute function.
    pub hit: bool,
    /// Received from another caller's in-flight computation.
    pub coalesced: bool,
    /// Backend that holds (or now holds) the entry.
    pub stored_in: Option<String>,
    pub persist_error: Option<String>,
}

/// Cache-aside store over a primary backend and an optional fallback.
#[derive(Clone)]
pub struct ExtractionCache {
    primary: Arc<dyn StorageBackend>,
    fallback: Option<Arc<dyn StorageBackend>>,
    inflight: Arc<InflightRegistry<Settled>>,
}

impl ExtractionCache {
    pub fn new(
        primary: Arc<dyn StorageBackend>,
        fallback: Option<Arc<dyn StorageBackend>>,
    ) -> Self {
        Self {
            primary,
            fallback,
            inflight: Arc::new(InflightRegistry::default()),
        }
    }

    fn backends(&self) -> impl Iterator<Item = &Arc<dyn StorageBackend>> {
        std::iter::once(&self.primary).chain(self.fallback.iter())
    }

    /// Number of keys with a computation currently in flight.
    pub fn pending_computations(&self) -> usize {
        self.inflight.len()
    }

    /// Returns the stored artifact for `(fingerprint, kind)`, or runs `compute`,
    /// persists its output and returns it.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        fingerprint: &ContentFingerprint,
        kind: ArtifactKind,
        compute: F,
    ) -> Result<Cached<T>, PipelineError>
    where
        T: Artifact,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed<T>, PipelineError>>,
    {
        let key = CacheKey::new(fingerprint, kind);
        let cell = self.inflight.join(key.as_str());

        let mut leader = false;
        let outcome = cell
            .get_or_try_init(|| {
                leader = true;
                self.resolve(&key, kind, compute)
            })
            .await
            .cloned();
        self.inflight.release(key.as_str(), &cell);

        let settled = outcome?;
        if !leader {
            debug!(%key, "Joined in-flight computation");
        }
        let value = T::decode(&settled.payload).map_err(|reason| {
            PipelineError::MalformedCacheEntry {
                key: key.to_string(),
                reason,
            }
        })?;

        Ok(Cached {
            value,
            metadata: settled.metadata,
            hit: settled.hit,
            coalesced: !leader,
            stored_in: settled.stored_in,
            persist_error: settled.persist_error,
        })
    }

    /// Looks up an artifact without computing it. Malformed entries read as `None`.
    pub async fn peek<T: Artifact>(
        &self,
        fingerprint: &ContentFingerprint,
        kind: ArtifactKind,
    ) -> Option<Cached<T>> {
        let key = CacheKey::new(fingerprint, kind);
        let found = self.lookup(&key).await?;
        match T::decode(&found.payload) {
            Ok(value) => Some(Cached {
                value,
                metadata: found.metadata,
                hit: true,
                coalesced: false,
                stored_in: Some(found.backend),
                persist_error: None,
            }),
            Err(reason) => {
                warn!(%key, %reason, "Stored artifact failed to decode");
                None
            }
        }
    }

    /// Deletes the entry from every backend so the next request recomputes it.
    /// Fails only if no backend could be reached.
    pub async fn invalidate(
        &self,
        fingerprint: &ContentFingerprint,
        kind: ArtifactKind,
    ) -> Result<(), PipelineError> {
        let key = CacheKey::new(fingerprint, kind);
        let mut last_error = None;
        let mut deleted = false;
        for backend in self.backends() {
            match backend.delete(key.as_str()).await {
                Ok(()) => deleted = true,
                Err(e) => {
                    warn!(%key, backend = backend.name(), error = %e, "Cache delete failed");
                    last_error = Some(e);
                }
            }
        }
        match (deleted, last_error) {
            (false, Some(e)) => Err(e.into()),
            _ => {
                info!(%key, "Invalidated cache entry");
                Ok(())
            }
        }
    }

    async fn resolve<T, F, Fut>(
        &self,
        key: &CacheKey,
        kind: ArtifactKind,
        compute: F,
    ) -> Result<Settled, PipelineError>
    where
        T: Artifact,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed<T>, PipelineError>>,
    {
        if let Some(found) = self.lookup(key).await {
            match T::decode(&found.payload) {
                Ok(_) => {
                    debug!(%key, backend = %found.backend, "Cache hit");
                    return Ok(Settled {
                        payload: found.payload,
                        metadata: found.metadata,
                        hit: true,
                        stored_in: Some(found.backend),
                        persist_error: None,
                    });
                }
                Err(reason) => {
                    let err = PipelineError::MalformedCacheEntry {
                        key: key.to_string(),
                        reason,
                    };
                    warn!(backend = %found.backend, error = %err, "Treating as cache miss");
                }
            }
        }

        info!(%key, "Cache miss, computing artifact");
        let computed = compute().await?;

        let payload = Bytes::from(computed.value.encode()?);
        let metadata =
            EntryMetadata::for_payload(kind, &payload, Some(computed.source.to_string()));

        let (stored_in, persist_error) = match self.persist(key, kind, &payload, &metadata).await
        {
            Ok(backend) => (Some(backend), None),
            Err(e) => {
                warn!(%key, error = %e, "Artifact computed but not persisted");
                (None, Some(e.to_string()))
            }
        };

        Ok(Settled {
            payload,
            metadata,
            hit: false,
            stored_in,
            persist_error,
        })
    }

    /// Reads the primary, consulting the fallback only when the primary is
    /// unreachable. Any other outcome is final.
    async fn lookup(&self, key: &CacheKey) -> Option<Found> {
        for backend in self.backends() {
            match Self::read(backend.as_ref(), key).await {
                Ok(found) => return found,
                Err(e @ PipelineError::MalformedCacheEntry { .. }) => {
                    warn!(backend = backend.name(), error = %e, "Treating as cache miss");
                    return None;
                }
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Cache read failed");
                }
            }
        }
        None
    }

    async fn read(
        backend: &dyn StorageBackend,
        key: &CacheKey,
    ) -> Result<Option<Found>, PipelineError> {
        if !backend.exists(key.as_str()).await? {
            return Ok(None);
        }
        let Some(stored) = backend.get(key.as_str()).await? else {
            return Ok(None);
        };
        let malformed = |reason: &str| PipelineError::MalformedCacheEntry {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let metadata = stored.metadata.ok_or_else(|| malformed("missing metadata"))?;
        if !metadata.matches(&stored.bytes) {
            return Err(malformed("checksum mismatch"));
        }
        Ok(Some(Found {
            payload: stored.bytes,
            metadata,
            backend: backend.name().to_string(),
        }))
    }

    /// Writes to the primary, or to the fallback when the primary rejects the write.
    async fn persist(
        &self,
        key: &CacheKey,
        kind: ArtifactKind,
        payload: &Bytes,
        metadata: &EntryMetadata,
    ) -> Result<String, PipelineError> {
        let mut last_error = None;
        for backend in self.backends() {
            match Self::write(backend.as_ref(), key, kind, payload, metadata).await {
                Ok(()) => return Ok(backend.name().to_string()),
                Err(e) => {
                    warn!(%key, backend = backend.name(), error = %e, "Cache write failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| PipelineError::BackendUnavailable {
            backend: "cache".to_string(),
            reason: "no backend configured".to_string(),
        }))
    }

    async fn write(
        backend: &dyn StorageBackend,
        key: &CacheKey,
        kind: ArtifactKind,
        payload: &Bytes,
        metadata: &EntryMetadata,
    ) -> Result<(), PipelineError> {
        // Another process may have written the same bytes since our lookup.
        if let Ok(Some(existing)) = backend.metadata(key.as_str()).await {
            if existing.checksum == metadata.checksum {
                if let Ok(Some(stored)) = backend.get(key.as_str()).await {
                    if stored.bytes == *payload {
                        debug!(%key, backend = backend.name(), "Identical payload already stored");
                        return Ok(());
                    }
                }
            }
        }
        backend
            .put(key.as_str(), payload.clone(), kind.content_type(), metadata)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;

    use crate::cache::entry::{EntryMetadata, StoredObject};
    use crate::storage::{StorageBackend, StorageError};

    /// In-memory backend with call counters and a failure switch.
    pub struct MemoryBackend {
        name: String,
        entries: Mutex<HashMap<String, (Bytes, Option<EntryMetadata>)>>,
        pub puts: AtomicUsize,
        pub gets: AtomicUsize,
        failing: AtomicBool,
    }

    impl MemoryBackend {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                entries: Mutex::new(HashMap::new()),
                puts: AtomicUsize::new(0),
                gets: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }

        pub fn failing(name: &str) -> Self {
            let backend = Self::new(name);
            backend.set_failing(true);
            backend
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn insert_raw(&self, key: &str, bytes: &[u8], metadata: Option<EntryMetadata>) {
            self.entries
                .lock()
                .insert(key.to_string(), (Bytes::copy_from_slice(bytes), metadata));
        }

        pub fn raw(&self, key: &str) -> Option<Bytes> {
            self.entries.lock().get(key).map(|(b, _)| b.clone())
        }

        pub fn len(&self) -> usize {
            self.entries.lock().len()
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StorageError::unavailable(&self.name, "simulated outage"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl StorageBackend for MemoryBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn put(
            &self,
            key: &str,
            bytes: Bytes,
            _content_type: &str,
            metadata: &EntryMetadata,
        ) -> Result<(), StorageError> {
            self.check()?;
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.entries
                .lock()
                .insert(key.to_string(), (bytes, Some(metadata.clone())));
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
            self.check()?;
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .entries
                .lock()
                .get(key)
                .map(|(bytes, metadata)| StoredObject {
                    bytes: bytes.clone(),
                    metadata: metadata.clone(),
                }))
        }

        async fn exists(&self, key: &str) -> Result<bool, StorageError> {
            self.check()?;
            Ok(self.entries.lock().contains_key(key))
        }

        async fn metadata(&self, key: &str) -> Result<Option<EntryMetadata>, StorageError> {
            self.check()?;
            Ok(self.entries.lock().get(key).and_then(|(_, m)| m.clone()))
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.check()?;
            self.entries.lock().remove(key);
            Ok(())
        }
    }
}

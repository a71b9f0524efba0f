use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::cache::key::ArtifactKind;
use crate::fingerprint::sha256_hex;
use crate::models::resume::StructuredSections;
use crate::models::theme::{ColorTheme, FontTheme};
use crate::pipeline::PipelineError;

const META_CREATED_AT: &str = "folio-created-at";
const META_CHECKSUM: &str = "folio-checksum";
const META_SCHEMA: &str = "folio-schema-version";
const META_CONTENT_TYPE: &str = "folio-content-type";
const META_SOURCE: &str = "folio-source";

/// Metadata stored alongside every cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the payload; verified on every read.
    pub checksum: String,
    pub schema_version: u32,
    pub content_type: String,
    /// Which producer made the payload (`heuristic`, `ai:<model>`, `defaulted`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl EntryMetadata {
    pub fn for_payload(kind: ArtifactKind, payload: &[u8], source: Option<String>) -> Self {
        Self {
            created_at: Utc::now(),
            checksum: sha256_hex(payload),
            schema_version: kind.schema_version(),
            content_type: kind.content_type().to_string(),
            source,
        }
    }

    pub fn matches(&self, payload: &[u8]) -> bool {
        self.checksum == sha256_hex(payload)
    }

    /// Flattens into object-store user metadata.
    pub fn to_user_metadata(&self) -> HashMap<String, String> {
        let mut map = HashMap::from([
            (META_CREATED_AT.to_string(), self.created_at.to_rfc3339()),
            (META_CHECKSUM.to_string(), self.checksum.clone()),
            (META_SCHEMA.to_string(), self.schema_version.to_string()),
            (META_CONTENT_TYPE.to_string(), self.content_type.clone()),
        ]);
        if let Some(source) = &self.source {
            map.insert(META_SOURCE.to_string(), source.clone());
        }
        map
    }

    /// Rebuilds metadata from object-store user metadata. Returns `None` when a
    /// required field is missing or unparseable.
    pub fn from_user_metadata(map: &HashMap<String, String>) -> Option<Self> {
        let created_at = DateTime::parse_from_rfc3339(map.get(META_CREATED_AT)?)
            .ok()?
            .with_timezone(&Utc);
        Some(Self {
            created_at,
            checksum: map.get(META_CHECKSUM)?.clone(),
            schema_version: map.get(META_SCHEMA)?.parse().ok()?,
            content_type: map.get(META_CONTENT_TYPE).cloned().unwrap_or_default(),
            source: map.get(META_SOURCE).cloned(),
        })
    }
}

/// A payload and its metadata as read back from a backend.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    /// `None` when the entry was written without metadata (treated as malformed).
    pub metadata: Option<EntryMetadata>,
}

// ────────────────────────────────────────────────────────────────────────────
// Artifact encoding
// ────────────────────────────────────────────────────────────────────────────

/// A value that can be persisted as a cache entry.
pub trait Artifact: Clone + Send + Sync + 'static {
    fn encode(&self) -> Result<Vec<u8>, PipelineError>;
    fn decode(bytes: &[u8]) -> Result<Self, String>;
}

impl Artifact for String {
    fn encode(&self) -> Result<Vec<u8>, PipelineError> {
        Ok(self.as_bytes().to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<Self, String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| format!("invalid UTF-8: {e}"))
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, PipelineError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {e}"))
}

macro_rules! json_artifact {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Artifact for $ty {
                fn encode(&self) -> Result<Vec<u8>, PipelineError> {
                    encode_json(self)
                }

                fn decode(bytes: &[u8]) -> Result<Self, String> {
                    decode_json(bytes)
                }
            }
        )*
    };
}

json_artifact!(StructuredSections, ColorTheme, FontTheme);

// ────────────────────────────────────────────────────────────────────────────
// Provenance
// ────────────────────────────────────────────────────────────────────────────

/// Where a freshly computed artifact came from. Recorded as entry metadata so
/// callers can tell derived values from defaults without treating either as
/// an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Extracted,
    Derived,
    Defaulted,
    Heuristic,
    Ai { model: String },
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::Extracted => f.write_str("extracted"),
            ArtifactSource::Derived => f.write_str("derived"),
            ArtifactSource::Defaulted => f.write_str("defaulted"),
            ArtifactSource::Heuristic => f.write_str("heuristic"),
            ArtifactSource::Ai { model } => write!(f, "ai:{model}"),
        }
    }
}

/// Output of a compute function handed to `ExtractionCache::get_or_compute`.
#[derive(Debug, Clone)]
pub struct Computed<T> {
    pub value: T,
    pub source: ArtifactSource,
}

impl<T> Computed<T> {
    pub fn new(value: T, source: ArtifactSource) -> Self {
        Self { value, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_metadata_round_trip() {
        let meta = EntryMetadata::for_payload(
            ArtifactKind::ColorTheme,
            b"{}",
            Some("derived".to_string()),
        );
        let map = meta.to_user_metadata();
        let back = EntryMetadata::from_user_metadata(&map).unwrap();
        assert_eq!(back.checksum, meta.checksum);
        assert_eq!(back.schema_version, 1);
        assert_eq!(back.source.as_deref(), Some("derived"));
        assert_eq!(back.created_at.timestamp(), meta.created_at.timestamp());
    }

    #[test]
    fn test_user_metadata_missing_checksum_is_rejected() {
        let meta = EntryMetadata::for_payload(ArtifactKind::RawText, b"hello", None);
        let mut map = meta.to_user_metadata();
        map.remove(META_CHECKSUM);
        assert!(EntryMetadata::from_user_metadata(&map).is_none());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let meta = EntryMetadata::for_payload(ArtifactKind::RawText, b"hello", None);
        assert!(meta.matches(b"hello"));
        assert!(!meta.matches(b"hellp"));
    }

    #[test]
    fn test_text_artifact_rejects_invalid_utf8() {
        assert!(String::decode(&[0xff, 0xfe]).is_err());
        assert_eq!(String::decode(b"hi").unwrap(), "hi");
    }

    #[test]
    fn test_artifact_source_labels() {
        let ai = ArtifactSource::Ai {
            model: "claude-sonnet-4-5".to_string(),
        };
        assert_eq!(ai.to_string(), "ai:claude-sonnet-4-5");
        assert_eq!(ArtifactSource::Defaulted.to_string(), "defaulted");
    }
}

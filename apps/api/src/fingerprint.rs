//! Content fingerprints: SHA-256 digests of raw document bytes used as cache keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::pipeline::PipelineError;

/// Lowercase hex SHA-256 digest of a source document.
///
/// Identical bytes always produce the identical fingerprint, across processes
/// and platforms. The value is never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub const HEX_LEN: usize = 64;

    /// Parses a fingerprint received from an upstream consumer (e.g. a URL segment).
    pub fn from_hex(value: &str) -> Option<Self> {
        let valid = value.len() == Self::HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints a document. Empty input is rejected with `EmptyInput`.
pub fn fingerprint(bytes: &[u8]) -> Result<ContentFingerprint, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(ContentFingerprint(sha256_hex(bytes)))
}

/// Fingerprints a composite input (e.g. a résumé fingerprint plus a job description).
///
/// Each part is length-prefixed so `["ab", "c"]` and `["a", "bc"]` never collide.
pub fn fingerprint_parts(parts: &[&[u8]]) -> Result<ContentFingerprint, PipelineError> {
    if parts.iter().all(|p| p.is_empty()) {
        return Err(PipelineError::EmptyInput);
    }
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    Ok(ContentFingerprint(hex::encode(hasher.finalize())))
}

/// Hex SHA-256 of a payload. Also used for cache-entry checksums.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fingerprint::ContentFingerprint;

/// The kinds of derived artifact stored under a document fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    RawText,
    StructuredSections,
    ColorTheme,
    FontTheme,
    CoverLetter,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::RawText,
        ArtifactKind::StructuredSections,
        ArtifactKind::ColorTheme,
        ArtifactKind::FontTheme,
        ArtifactKind::CoverLetter,
    ];

    /// First path segment of every key of this kind.
    pub fn namespace(&self) -> &'static str {
        match self {
            ArtifactKind::RawText => "raw-text",
            ArtifactKind::StructuredSections => "sections",
            ArtifactKind::ColorTheme => "color-theme",
            ArtifactKind::FontTheme => "font-theme",
            ArtifactKind::CoverLetter => "cover-letter",
        }
    }

    /// Bumped whenever the serialized shape of the artifact changes, so new
    /// entries never collide with old ones.
    pub fn schema_version(&self) -> u32 {
        match self {
            ArtifactKind::RawText => 1,
            ArtifactKind::StructuredSections => 1,
            ArtifactKind::ColorTheme => 1,
            ArtifactKind::FontTheme => 1,
            ArtifactKind::CoverLetter => 1,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ArtifactKind::RawText | ArtifactKind::CoverLetter)
    }

    pub fn content_type(&self) -> &'static str {
        if self.is_text() {
            "text/plain; charset=utf-8"
        } else {
            "application/json"
        }
    }

    pub fn file_name(&self) -> String {
        let ext = if self.is_text() { "txt" } else { "json" };
        format!("{}.v{}.{}", self.namespace(), self.schema_version(), ext)
    }

    pub fn from_namespace(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.namespace() == value)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Storage key: `{artifact-kind}/{fingerprint}/{versioned-filename}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(fingerprint: &ContentFingerprint, kind: ArtifactKind) -> Self {
        Self(format!(
            "{}/{}/{}",
            kind.namespace(),
            fingerprint,
            kind.file_name()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

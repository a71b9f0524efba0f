//! Document pipeline: fingerprint → raw text → structured sections, with the
//! colour and font themes derived concurrently from the drawing operations.
//!
//! Every stage goes through `ExtractionCache`, so re-processing the same bytes
//! reads stored artifacts instead of recomputing them.

mod error;

pub use error::PipelineError;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::analysis::AnalysisService;
use crate::cache::{Artifact, ArtifactKind, ArtifactSource, Cached, Computed, ExtractionCache};
use crate::extract::{self, DrawingSummary};
use crate::fingerprint::{fingerprint, fingerprint_parts, ContentFingerprint};
use crate::models::resume::StructuredSections;
use crate::models::theme::{ColorTheme, FontTheme};
use crate::theme::{derive_color_theme, derive_font_theme};

/// How one artifact of a processed document was obtained.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactReport {
    pub kind: ArtifactKind,
    pub cache_hit: bool,
    pub coalesced: bool,
    pub source: Option<String>,
    /// Backend holding the entry; `None` when every write failed.
    pub persisted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

impl ArtifactReport {
    fn of<T>(kind: ArtifactKind, cached: &Cached<T>) -> Self {
        Self {
            kind,
            cache_hit: cached.hit,
            coalesced: cached.coalesced,
            source: cached.metadata.source.clone(),
            persisted: cached.stored_in.clone(),
            persist_error: cached.persist_error.clone(),
        }
    }
}

/// Every artifact of one document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    pub fingerprint: ContentFingerprint,
    pub raw_text: String,
    pub sections: StructuredSections,
    pub color_theme: ColorTheme,
    pub font_theme: FontTheme,
    pub artifacts: Vec<ArtifactReport>,
}

/// A cover letter and the composite fingerprint it is stored under.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetter {
    pub fingerprint: ContentFingerprint,
    pub letter: String,
    pub artifact: ArtifactReport,
}

/// A stored artifact as served to readers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredArtifact {
    Text(String),
    Json(Value),
}

#[derive(Clone)]
pub struct DocumentPipeline {
    cache: ExtractionCache,
    analysis: AnalysisService,
}

impl DocumentPipeline {
    pub fn new(cache: ExtractionCache, analysis: AnalysisService) -> Self {
        Self { cache, analysis }
    }

    /// Runs every stage for `bytes`. Fails on empty input, on documents whose
    /// text cannot be extracted, and when a computed artifact cannot be encoded.
    pub async fn process(&self, bytes: Bytes) -> Result<ProcessedDocument, PipelineError> {
        let fp = fingerprint(&bytes)?;
        info!(fingerprint = %fp, size = bytes.len(), "Processing document");

        let raw_text = self.raw_text(&fp, &bytes).await?;
        let sections = self.structured_sections(&fp, &raw_text.value).await?;
        let (color, font) = self.themes(&fp, &bytes).await?;

        let artifacts = vec![
            ArtifactReport::of(ArtifactKind::RawText, &raw_text),
            ArtifactReport::of(ArtifactKind::StructuredSections, &sections),
            ArtifactReport::of(ArtifactKind::ColorTheme, &color),
            ArtifactReport::of(ArtifactKind::FontTheme, &font),
        ];

        Ok(ProcessedDocument {
            fingerprint: fp,
            raw_text: raw_text.value,
            sections: sections.value,
            color_theme: color.value,
            font_theme: font.value,
            artifacts,
        })
    }

    async fn raw_text(
        &self,
        fp: &ContentFingerprint,
        bytes: &Bytes,
    ) -> Result<Cached<String>, PipelineError> {
        self.cache
            .get_or_compute(fp, ArtifactKind::RawText, || async {
                let text = extract::extract_raw_text(bytes.clone()).await?;
                Ok(Computed::new(text, ArtifactSource::Extracted))
            })
            .await
    }

    async fn structured_sections(
        &self,
        fp: &ContentFingerprint,
        raw_text: &str,
    ) -> Result<Cached<StructuredSections>, PipelineError> {
        self.cache
            .get_or_compute(fp, ArtifactKind::StructuredSections, || async {
                Ok(self.analysis.structure(raw_text).await)
            })
            .await
    }

    /// Derives both themes concurrently. The drawing summary is extracted at
    /// most once and only if at least one theme misses the cache. A document
    /// whose drawing operations cannot be read gets default themes.
    async fn themes(
        &self,
        fp: &ContentFingerprint,
        bytes: &Bytes,
    ) -> Result<(Cached<ColorTheme>, Cached<FontTheme>), PipelineError> {
        let drawing: OnceCell<DrawingSummary> = OnceCell::new();
        let load_drawing = || {
            drawing.get_or_init(|| async {
                extract::extract_drawing(bytes.clone())
                    .await
                    .unwrap_or_else(|e| {
                        warn!(
                            fingerprint = %fp,
                            error = %e,
                            "Drawing extraction failed, themes will use defaults"
                        );
                        DrawingSummary::default()
                    })
            })
        };

        let (color, font) = tokio::join!(
            self.cache
                .get_or_compute(fp, ArtifactKind::ColorTheme, || async {
                    let summary = load_drawing().await;
                    Ok(Computed::from(derive_color_theme(&summary.color_ops)))
                }),
            self.cache
                .get_or_compute(fp, ArtifactKind::FontTheme, || async {
                    let summary = load_drawing().await;
                    Ok(Computed::from(derive_font_theme(&summary.font_usages)))
                }),
        );
        Ok((color?, font?))
    }

    /// Returns the cover letter for a processed document and a job description,
    /// generating and storing it on first request.
    pub async fn cover_letter(
        &self,
        fp: &ContentFingerprint,
        job_description: &str,
    ) -> Result<CoverLetter, PipelineError> {
        let sections = self
            .cache
            .peek::<StructuredSections>(fp, ArtifactKind::StructuredSections)
            .await
            .ok_or_else(|| PipelineError::UnknownDocument(fp.to_string()))?;

        let letter_fp = fingerprint_parts(&[fp.as_str().as_bytes(), job_description.as_bytes()])?;
        let cached = self
            .cache
            .get_or_compute(&letter_fp, ArtifactKind::CoverLetter, || async {
                Ok(self
                    .analysis
                    .cover_letter(&sections.value.structured_content, job_description)
                    .await)
            })
            .await?;

        Ok(CoverLetter {
            artifact: ArtifactReport::of(ArtifactKind::CoverLetter, &cached),
            fingerprint: letter_fp,
            letter: cached.value,
        })
    }

    /// Reads a stored artifact without computing anything.
    pub async fn artifact(
        &self,
        fp: &ContentFingerprint,
        kind: ArtifactKind,
    ) -> Result<Option<StoredArtifact>, PipelineError> {
        match kind {
            ArtifactKind::RawText | ArtifactKind::CoverLetter => Ok(self
                .cache
                .peek::<String>(fp, kind)
                .await
                .map(|c| StoredArtifact::Text(c.value))),
            ArtifactKind::StructuredSections => {
                self.json_artifact::<StructuredSections>(fp, kind).await
            }
            ArtifactKind::ColorTheme => self.json_artifact::<ColorTheme>(fp, kind).await,
            ArtifactKind::FontTheme => self.json_artifact::<FontTheme>(fp, kind).await,
        }
    }

    async fn json_artifact<T: Artifact + Serialize>(
        &self,
        fp: &ContentFingerprint,
        kind: ArtifactKind,
    ) -> Result<Option<StoredArtifact>, PipelineError> {
        match self.cache.peek::<T>(fp, kind).await {
            Some(cached) => Ok(Some(StoredArtifact::Json(serde_json::to_value(cached.value)?))),
            None => Ok(None),
        }
    }

    /// Removes a stored artifact so the next request recomputes it.
    pub async fn invalidate(
        &self,
        fp: &ContentFingerprint,
        kind: ArtifactKind,
    ) -> Result<(), PipelineError> {
        self.cache.invalidate(fp, kind).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lopdf::Object;

    use super::*;
    use crate::cache::test_support::MemoryBackend;
    use crate::cache::CacheKey;
    use crate::extract::test_support::{op, single_page_pdf, text};
    use crate::models::resume::SectionKind;

    const RESUME: &str = "Jane Doe\nABOUT\nBackend engineer.\njane@example.com\nSKILLS\nRust, Go";

    fn pipeline() -> (DocumentPipeline, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new("memory"));
        let cache = ExtractionCache::new(backend.clone(), None);
        (
            DocumentPipeline::new(cache, AnalysisService::heuristic_only()),
            backend,
        )
    }

    fn themed_pdf() -> Vec<u8> {
        single_page_pdf(
            vec![
                op("rg", vec![0.into(), 0.into(), 1.into()]),
                op("rg", vec![1.into(), Object::Real(0.5), 0.into()]),
                op("BT", vec![]),
                op("Tf", vec![Object::Name(b"F1".to_vec()), 11.into()]),
                op("Tj", vec![text("Jane Doe")]),
                op("ET", vec![]),
            ],
            "ABCDEF+Merriweather-Regular",
        )
    }

    #[tokio::test]
    async fn test_process_rejects_empty_input() {
        let (pipeline, backend) = pipeline();
        let err = pipeline.process(Bytes::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test]
    async fn test_process_rejects_non_pdf_without_caching() {
        let (pipeline, backend) = pipeline();
        let err = pipeline
            .process(Bytes::from_static(b"RESUME-V1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test]
    async fn test_themes_are_derived_once_and_cached() {
        let (pipeline, backend) = pipeline();
        let bytes = Bytes::from(themed_pdf());
        let fp = fingerprint(&bytes).unwrap();

        let (color, font) = pipeline.themes(&fp, &bytes).await.unwrap();
        assert!(!color.hit && !font.hit);
        assert_eq!(color.metadata.source.as_deref(), Some("derived"));
        assert_eq!(color.value.text, "#0000ff");
        assert!(!color.value.is_dark);
        assert!(font.value.body.starts_with("\"Merriweather\""));
        assert_eq!(backend.len(), 2);

        let (color, font) = pipeline.themes(&fp, &bytes).await.unwrap();
        assert!(color.hit && font.hit);
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_drawing_yields_default_themes() {
        let (pipeline, _) = pipeline();
        let bytes = Bytes::from_static(b"RESUME-V1");
        let fp = fingerprint(&bytes).unwrap();

        let (color, font) = pipeline.themes(&fp, &bytes).await.unwrap();
        assert_eq!(color.metadata.source.as_deref(), Some("defaulted"));
        assert_eq!(font.metadata.source.as_deref(), Some("defaulted"));
        assert_eq!(color.value, crate::theme::default_color_theme());
    }

    #[tokio::test]
    async fn test_structured_sections_are_cached() {
        let (pipeline, backend) = pipeline();
        let fp = fingerprint(b"RESUME-V1").unwrap();

        let first = pipeline.structured_sections(&fp, RESUME).await.unwrap();
        assert!(!first.hit);
        assert_eq!(first.metadata.source.as_deref(), Some("heuristic"));
        assert_eq!(
            first.value.sections.lines(SectionKind::Skills),
            ["Rust, Go"]
        );

        let second = pipeline.structured_sections(&fp, "ignored").await.unwrap();
        assert!(second.hit);
        assert_eq!(second.value, first.value);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_cover_letter_requires_processed_document() {
        let (pipeline, _) = pipeline();
        let fp = fingerprint(b"never processed").unwrap();
        let err = pipeline.cover_letter(&fp, "Engineer").await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownDocument(_)));
    }

    #[tokio::test]
    async fn test_cover_letter_is_keyed_by_job_description() {
        let (pipeline, _) = pipeline();
        let fp = fingerprint(b"RESUME-V1").unwrap();
        pipeline.structured_sections(&fp, RESUME).await.unwrap();

        let first = pipeline.cover_letter(&fp, "Platform Engineer").await.unwrap();
        assert!(!first.artifact.cache_hit);
        assert_eq!(first.artifact.source.as_deref(), Some("heuristic"));
        assert!(first.letter.contains("Platform Engineer position"));
        assert_ne!(first.fingerprint, fp);

        let again = pipeline.cover_letter(&fp, "Platform Engineer").await.unwrap();
        assert!(again.artifact.cache_hit);
        assert_eq!(again.letter, first.letter);

        let other = pipeline.cover_letter(&fp, "Data Engineer").await.unwrap();
        assert!(!other.artifact.cache_hit);
        assert_ne!(other.fingerprint, first.fingerprint);

        let stored = pipeline
            .artifact(&first.fingerprint, ArtifactKind::CoverLetter)
            .await
            .unwrap();
        assert_eq!(stored, Some(StoredArtifact::Text(first.letter)));
    }

    #[tokio::test]
    async fn test_artifact_lookup_and_invalidate() {
        let (pipeline, backend) = pipeline();
        let fp = fingerprint(b"RESUME-V1").unwrap();
        assert_eq!(
            pipeline.artifact(&fp, ArtifactKind::StructuredSections).await.unwrap(),
            None
        );

        pipeline.structured_sections(&fp, RESUME).await.unwrap();
        let Some(StoredArtifact::Json(json)) = pipeline
            .artifact(&fp, ArtifactKind::StructuredSections)
            .await
            .unwrap()
        else {
            panic!("expected a JSON artifact");
        };
        assert_eq!(json["source"], "heuristic");
        assert_eq!(json["structuredContent"]["name"], "Jane Doe");

        pipeline
            .invalidate(&fp, ArtifactKind::StructuredSections)
            .await
            .unwrap();
        let key = CacheKey::new(&fp, ArtifactKind::StructuredSections);
        assert!(backend.raw(key.as_str()).is_none());
        assert_eq!(
            pipeline.artifact(&fp, ArtifactKind::StructuredSections).await.unwrap(),
            None
        );
    }
}

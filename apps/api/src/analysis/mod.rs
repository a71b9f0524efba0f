//! Résumé analysis: section structuring and cover letters.
//!
//! Both operations prefer the AI collaborator when one is configured and fall
//! back to deterministic local output on any collaborator failure. The
//! fallback is logged, never surfaced as an error.

pub mod cover_letter;
pub mod prompts;
pub mod validation;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{ArtifactSource, Computed};
use crate::llm_client::prompts::{clip_document, GROUNDING_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::resume::{StructuredContent, StructuredSections};
use crate::pipeline::PipelineError;
use crate::sections::heuristic_structure;

use self::cover_letter::{build_cover_letter_prompt, template_cover_letter};
use self::prompts::{COVER_LETTER_SYSTEM, STRUCTURE_PROMPT_TEMPLATE, STRUCTURE_SYSTEM};

#[derive(Clone)]
pub struct AnalysisService {
    llm: Option<LlmClient>,
    timeout: Duration,
}

impl AnalysisService {
    /// `timeout` bounds each collaborator operation, retries included.
    pub fn new(llm: Option<LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// No collaborator; every call takes the local path.
    pub fn heuristic_only() -> Self {
        Self::new(None, Duration::ZERO)
    }

    pub fn ai_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Splits raw résumé text into sections and structured content.
    pub async fn structure(&self, raw_text: &str) -> Computed<StructuredSections> {
        if let Some(llm) = self.llm.as_ref().filter(|_| !raw_text.trim().is_empty()) {
            match self.structure_with_ai(llm, raw_text).await {
                Ok(structured) => {
                    info!(
                        sections = structured.sections.sections.len(),
                        "AI structuring succeeded"
                    );
                    return Computed::new(
                        structured,
                        ArtifactSource::Ai {
                            model: llm.model().to_string(),
                        },
                    );
                }
                Err(e) => warn!(error = %e, "AI structuring failed, using heuristic parser"),
            }
        }
        Computed::new(heuristic_structure(raw_text), ArtifactSource::Heuristic)
    }

    async fn structure_with_ai(
        &self,
        llm: &LlmClient,
        raw_text: &str,
    ) -> Result<StructuredSections, PipelineError> {
        let prompt = STRUCTURE_PROMPT_TEMPLATE
            .replace("{grounding}", GROUNDING_INSTRUCTION)
            .replace("{resume_text}", clip_document(raw_text));
        let value: Value = self
            .bounded(llm.call_json::<Value>(&prompt, STRUCTURE_SYSTEM))
            .await?;
        validation::validate_structuring(value).map_err(PipelineError::UpstreamCollaborator)
    }

    /// Writes a cover letter for `job_description` from structured content.
    pub async fn cover_letter(
        &self,
        content: &StructuredContent,
        job_description: &str,
    ) -> Computed<String> {
        if let Some(llm) = &self.llm {
            match self.cover_letter_with_ai(llm, content, job_description).await {
                Ok(letter) => {
                    return Computed::new(
                        letter,
                        ArtifactSource::Ai {
                            model: llm.model().to_string(),
                        },
                    )
                }
                Err(e) => warn!(error = %e, "AI cover letter failed, using template"),
            }
        }
        Computed::new(
            template_cover_letter(content, job_description),
            ArtifactSource::Heuristic,
        )
    }

    async fn cover_letter_with_ai(
        &self,
        llm: &LlmClient,
        content: &StructuredContent,
        job_description: &str,
    ) -> Result<String, PipelineError> {
        let prompt = build_cover_letter_prompt(content, job_description)?;
        self.bounded(llm.call_text(&prompt, COVER_LETTER_SYSTEM))
            .await
    }

    /// Applies the collaborator timeout and maps transport failures.
    async fn bounded<T, E, F>(&self, call: F) -> Result<T, PipelineError>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PipelineError::UpstreamCollaborator(e.to_string())),
            Err(_) => Err(PipelineError::UpstreamCollaborator(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{SectionKind, StructuringSource};

    const RESUME: &str = "Jane Doe\nABOUT\nBackend engineer.\njane@example.com\nSKILLS\nRust, Go\n2019 - 2023 | Acme | Engineer";

    #[tokio::test]
    async fn test_structure_without_client_is_heuristic() {
        let service = AnalysisService::heuristic_only();
        assert!(!service.ai_enabled());

        let computed = service.structure(RESUME).await;
        assert_eq!(computed.source, ArtifactSource::Heuristic);
        assert_eq!(computed.value.source, StructuringSource::Heuristic);
        assert_eq!(
            computed.value.sections.lines(SectionKind::Contact),
            ["jane@example.com"]
        );
        assert_eq!(computed.value.structured_content.name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_cover_letter_without_client_uses_template() {
        let service = AnalysisService::heuristic_only();
        let sections = service.structure(RESUME).await.value;
        let computed = service
            .cover_letter(&sections.structured_content, "Platform Engineer")
            .await;
        assert_eq!(computed.source, ArtifactSource::Heuristic);
        assert!(computed.value.contains("Platform Engineer position"));
        assert!(computed.value.trim_end().ends_with("Jane Doe"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_maps_timeout_to_upstream_error() {
        let service = AnalysisService::new(None, Duration::from_secs(2));
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, String>(())
        };
        let err = service.bounded(slow).await.unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamCollaborator(m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_bounded_maps_call_error() {
        let service = AnalysisService::new(None, Duration::from_secs(2));
        let failing = async { Err::<(), _>("status 529") };
        let err = service.bounded(failing).await.unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamCollaborator(m) if m == "status 529"));
    }
}

//! PDF collaborators: raw text via `pdf-extract`, drawing operations via `lopdf`.
//!
//! Both parsers are synchronous and may be slow (or panic) on hostile input,
//! so they run on the blocking pool. A panic surfaces as `Extraction`.

pub mod drawing;

use bytes::Bytes;
use tokio::task;

use crate::pipeline::PipelineError;

pub use drawing::DrawingSummary;

pub async fn extract_raw_text(bytes: Bytes) -> Result<String, PipelineError> {
    task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| PipelineError::Extraction(format!("text extraction aborted: {e}")))?
        .map_err(|e| PipelineError::Extraction(e.to_string()))
}

pub async fn extract_drawing(bytes: Bytes) -> Result<DrawingSummary, PipelineError> {
    task::spawn_blocking(move || drawing::extract_drawing(&bytes))
        .await
        .map_err(|e| PipelineError::Extraction(format!("drawing extraction aborted: {e}")))?
        .map_err(|e| PipelineError::Extraction(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_pdf_input_is_an_extraction_error() {
        let bytes = Bytes::from_static(b"RESUME-V1");
        assert!(matches!(
            extract_raw_text(bytes.clone()).await,
            Err(PipelineError::Extraction(_))
        ));
        assert!(matches!(
            extract_drawing(bytes).await,
            Err(PipelineError::Extraction(_))
        ));
    }
}

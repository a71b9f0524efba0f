use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;

use crate::cache::ArtifactKind;
use crate::errors::AppError;
use crate::fingerprint::ContentFingerprint;
use crate::pipeline::{CoverLetter, ProcessedDocument, StoredArtifact};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterRequest {
    pub job_description: String,
}

fn parse_fingerprint(value: &str) -> Result<ContentFingerprint, AppError> {
    ContentFingerprint::from_hex(value)
        .ok_or_else(|| AppError::Validation(format!("'{value}' is not a document fingerprint")))
}

fn upload_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(err.body_text())
    }
}

fn parse_kind(value: &str) -> Result<ArtifactKind, AppError> {
    ArtifactKind::from_namespace(value)
        .ok_or_else(|| AppError::Validation(format!("unknown artifact kind '{value}'")))
}

/// POST /api/v1/documents
/// Multipart upload; the `file` field carries the PDF bytes. The request body
/// is capped at `max_upload_bytes`.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessedDocument>, AppError> {
    let mut upload: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(
                field
                    .bytes()
                    .await
                    .map_err(upload_error)?,
            );
            break;
        }
    }
    let bytes = upload.ok_or_else(|| {
        AppError::Validation(format!("multipart field '{UPLOAD_FIELD}' is required"))
    })?;

    let document = state.pipeline.process(bytes).await?;
    info!(fingerprint = %document.fingerprint, "Document processed");
    Ok(Json(document))
}

/// GET /api/v1/documents/:fingerprint/:kind
pub async fn handle_get_artifact(
    State(state): State<AppState>,
    Path((fingerprint, kind)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let fp = parse_fingerprint(&fingerprint)?;
    let kind = parse_kind(&kind)?;
    match state.pipeline.artifact(&fp, kind).await? {
        Some(StoredArtifact::Text(text)) => Ok((
            [(header::CONTENT_TYPE, kind.content_type())],
            text,
        )
            .into_response()),
        Some(StoredArtifact::Json(value)) => Ok(Json(value).into_response()),
        None => Err(AppError::NotFound(format!("no {kind} stored for {fp}"))),
    }
}

/// DELETE /api/v1/documents/:fingerprint/:kind
pub async fn handle_delete_artifact(
    State(state): State<AppState>,
    Path((fingerprint, kind)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let fp = parse_fingerprint(&fingerprint)?;
    let kind = parse_kind(&kind)?;
    state.pipeline.invalidate(&fp, kind).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/documents/:fingerprint/cover-letters
pub async fn handle_cover_letter(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
    Json(req): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetter>, AppError> {
    let fp = parse_fingerprint(&fingerprint)?;
    let job_description = req.job_description.trim();
    if job_description.is_empty() {
        return Err(AppError::Validation(
            "jobDescription must not be empty".to_string(),
        ));
    }
    let letter = state.pipeline.cover_letter(&fp, job_description).await?;
    Ok(Json(letter))
}

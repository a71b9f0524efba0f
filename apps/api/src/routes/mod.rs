pub mod documents;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/documents",
            post(documents::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/documents/:fingerprint/cover-letters",
            post(documents::handle_cover_letter),
        )
        .route(
            "/api/v1/documents/:fingerprint/:kind",
            get(documents::handle_get_artifact).delete(documents::handle_delete_artifact),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::AnalysisService;
    use crate::cache::test_support::MemoryBackend;
    use crate::cache::{ArtifactKind, ArtifactSource, Computed, ExtractionCache};
    use crate::config::Config;
    use crate::fingerprint::fingerprint;
    use crate::pipeline::DocumentPipeline;
    use crate::sections::heuristic_structure;

    const RESUME: &str = "Jane Doe\nABOUT\nBackend engineer.\nSKILLS\nRust, Go";

    struct Harness {
        router: Router,
        cache: ExtractionCache,
    }

    fn harness() -> Harness {
        harness_with(&[])
    }

    fn harness_with(vars: &[(&str, &str)]) -> Harness {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::from_lookup(|key| {
            vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap();
        let cache = ExtractionCache::new(Arc::new(MemoryBackend::new("memory")), None);
        let state = AppState {
            pipeline: DocumentPipeline::new(cache.clone(), AnalysisService::heuristic_only()),
            config,
        };
        Harness {
            router: build_router(state),
            cache,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    fn multipart(field: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--BOUNDARY\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"resume.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n--BOUNDARY--\r\n");
        Request::builder()
            .method("POST")
            .uri("/api/v1/documents")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    fn cover_letter_request(fp: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/documents/{fp}/cover-letters"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let (status, body) = send(&h.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"]["primary"], "filesystem");
        assert_eq!(body["aiStructuring"], false);
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let h = harness();
        let (status, body) = send(&h.router, multipart("attachment", b"%PDF")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_and_unreadable_documents() {
        let h = harness();
        let (status, _) = send(&h.router, multipart("file", b"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&h.router, multipart("file", b"RESUME-V1")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(&body)["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_upload_above_default_body_limit_reaches_pipeline() {
        let h = harness();
        let large = vec![b'x'; 3 * 1024 * 1024];
        let (status, body) = send(&h.router, multipart("file", &large)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(&body)["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_upload_over_configured_limit_is_rejected() {
        let h = harness_with(&[("MAX_UPLOAD_BYTES", "4096")]);
        let (status, body) = send(&h.router, multipart("file", &[b'x'; 16 * 1024])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(&body)["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_get_artifact_validates_path() {
        let h = harness();
        let (status, _) = send(&h.router, get("/api/v1/documents/not-a-hash/raw-text")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let fp = fingerprint(b"RESUME-V1").unwrap();
        let (status, _) = send(&h.router, get(&format!("/api/v1/documents/{fp}/thumbnail"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&h.router, get(&format!("/api/v1/documents/{fp}/raw-text"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_cover_letter_flow() {
        let h = harness();
        let fp = fingerprint(b"RESUME-V1").unwrap();

        let (status, _) = send(
            &h.router,
            cover_letter_request(fp.as_str(), json!({ "jobDescription": "Engineer" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        h.cache
            .get_or_compute(&fp, ArtifactKind::StructuredSections, || async {
                Ok(Computed::new(heuristic_structure(RESUME), ArtifactSource::Heuristic))
            })
            .await
            .unwrap();

        let (status, _) = send(
            &h.router,
            cover_letter_request(fp.as_str(), json!({ "jobDescription": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &h.router,
            cover_letter_request(fp.as_str(), json!({ "jobDescription": "Platform Engineer" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        let letter = body["letter"].as_str().unwrap().to_string();
        assert!(letter.contains("Platform Engineer position"));
        assert_eq!(body["artifact"]["cacheHit"], false);
        assert_eq!(body["artifact"]["persisted"], "memory");

        let letter_fp = body["fingerprint"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/documents/{letter_fp}/cover-letter");
        let (status, stored) = send(&h.router, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(stored).unwrap(), letter);

        let delete = Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.router, delete).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&h.router, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_json_artifact_is_served_as_json() {
        let h = harness();
        let fp = fingerprint(b"RESUME-V1").unwrap();
        h.cache
            .get_or_compute(&fp, ArtifactKind::StructuredSections, || async {
                Ok(Computed::new(heuristic_structure(RESUME), ArtifactSource::Heuristic))
            })
            .await
            .unwrap();

        let (status, body) = send(&h.router, get(&format!("/api/v1/documents/{fp}/sections"))).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["structuredContent"]["name"], "Jane Doe");
        assert_eq!(body["sections"]["sections"][0]["kind"], "header");
    }
}

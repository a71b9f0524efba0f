use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and which collaborators are configured.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let storage = &state.config.storage;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "folio-api",
        "storage": {
            "primary": storage.primary.as_str(),
            "fallback": storage.fallback.map(|kind| kind.as_str()),
        },
        "aiStructuring": state.config.anthropic_api_key.is_some(),
    }))
}

use crate::config::Config;
use crate::pipeline::DocumentPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: DocumentPipeline,
    pub config: Config,
}

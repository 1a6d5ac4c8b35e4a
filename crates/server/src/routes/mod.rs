// crates/server/src/routes/mod.rs
//! API route handlers.

pub mod analysis;
pub mod directories;
pub mod downloads;
pub mod evaluation;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod upload;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router. Everything but `/metrics` lives under `/api`.
///
/// Routes:
/// - GET  /api/health               - Health check
/// - GET  /api/directories          - Download folders
/// - GET  /api/data-directories     - Extraction output folders
/// - POST /api/upload_pdfs          - Save uploaded PDFs to a new folder
/// - POST /api/downloads            - Start a download job
/// - GET  /api/downloads/progress   - Download job record
/// - POST /api/downloads/abort      - Abort a download job
/// - POST /api/analysis             - Start an extraction job
/// - GET  /api/analysis/progress    - Extraction job record
/// - POST /api/analysis/abort       - Abort an extraction job
/// - POST /api/evaluation           - Start an evaluation job
/// - GET  /api/evaluation/progress  - Evaluation job record
/// - POST /api/evaluation/abort     - Abort an evaluation job
/// - GET  /metrics                  - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", directories::router())
        .nest("/api", upload::router())
        .nest("/api", downloads::router())
        .nest("/api", analysis::router())
        .nest("/api", evaluation::router())
        .merge(metrics::router())
        .with_state(state)
}

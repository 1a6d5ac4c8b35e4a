// crates/server/src/lib.rs
//! FACTS server library.
//!
//! Axum HTTP surface over the three job stages: paper download, grounded
//! answer extraction and evaluation. Jobs run on worker threads owned by
//! [`facts_jobs::JobRegistry`]; handlers only start, poll and abort them.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{Cli, ConfigError, ServerConfig};
pub use error::*;
pub use self::metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, directories, downloads, analysis, evaluation)
/// - `/metrics`
/// - CORS (allows any origin)
/// - Request tracing and per-route request metrics
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes(state)
        .layer(middleware::from_fn(track_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Records one request counter and duration sample per matched route.
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let response = next.run(request).await;
    self::metrics::record_request(&endpoint, response.status().as_u16(), start.elapsed());
    response
}

// crates/server/src/routes/directories.rs
//! Folder pickers for the UI.
//!
//! - GET /directories      - Subfolders of the downloads root
//! - GET /data-directories - Subfolders of the data root

use std::path::Path;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use facts_pipeline::list_subdirectories;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct DirectoriesResponse {
    pub directories: Vec<String>,
}

fn list(root: &Path) -> ApiResult<Json<DirectoriesResponse>> {
    list_subdirectories(root)
        .map(|directories| Json(DirectoriesResponse { directories }))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// GET /api/directories
async fn download_directories(State(state): State<Arc<AppState>>) -> ApiResult<Json<DirectoriesResponse>> {
    list(&state.config.downloads_root)
}

/// GET /api/data-directories
async fn data_directories(State(state): State<Arc<AppState>>) -> ApiResult<Json<DirectoriesResponse>> {
    list(&state.config.data_root)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/directories", get(download_directories))
        .route("/data-directories", get(data_directories))
}

// crates/server/src/routes/upload.rs
//! PDF upload.
//!
//! - POST /upload_pdfs - Save multipart `files` into a fresh
//!   `upload_<timestamp>` folder under the downloads root

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Local;
use serde::Serialize;

use facts_pipeline::{upload_dir, uploaded_pdf_name};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the documents.
const FILES_FIELD: &str = "files";

const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct UploadResponse {
    pub message: String,
    /// Folder name below the downloads root, ready for `POST /analysis`.
    pub folder: String,
    pub files: Vec<String>,
}

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::BadRequest(err.body_text())
}

/// POST /api/upload_pdfs
async fn upload_pdfs(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let folder = upload_dir(&state.config.downloads_root, Local::now());
    let mut saw_files = false;
    let mut files: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        saw_files = true;
        let Some(name) = field.file_name().and_then(uploaded_pdf_name) else {
            tracing::debug!(file = ?field.file_name(), "skipping non-PDF upload");
            continue;
        };
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        if files.is_empty() {
            tokio::fs::create_dir_all(&folder)
                .await
                .map_err(|e| ApiError::Internal(format!("{}: {e}", folder.display())))?;
        }
        let path = folder.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("{}: {e}", path.display())))?;
        if !files.contains(&name) {
            files.push(name);
        }
    }

    if !saw_files {
        return Err(ApiError::BadRequest("No files found.".into()));
    }
    if files.is_empty() {
        return Err(ApiError::BadRequest("No PDF files found.".into()));
    }

    let folder_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!(folder = %folder.display(), count = files.len(), "PDFs uploaded");
    Ok(Json(UploadResponse {
        message: "Files uploaded".into(),
        folder: folder_name,
        files,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/upload_pdfs",
        post(upload_pdfs).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

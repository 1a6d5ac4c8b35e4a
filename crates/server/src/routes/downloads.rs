// crates/server/src/routes/downloads.rs
//! Download job routes.
//!
//! - POST /downloads          - Start a download job
//! - GET  /downloads/progress - Poll a job record (`?id=`)
//! - POST /downloads/abort    - Request abort
//!
//! Search backends are not built in; the client submits the hit list and
//! the job fetches each `pdf_url`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};

use facts_jobs::{JobId, JobKind, JobSnapshot, LaunchError};
use facts_pipeline::{DownloadRequest, ManualSource, PaperDownloader, PaperRecord};

use super::jobs::{self, MessageResponse, ProgressQuery};
use crate::error::{ApiError, ApiResult};
use crate::metrics::record_job_launch;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartDownloadRequest {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub query: String,
    /// Accepts `2024` as well as `"2024"`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(default)]
    pub num_papers: usize,
    #[serde(default)]
    pub papers: Vec<PaperRecord>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StartDownloadResponse {
    pub download_id: JobId,
}

#[derive(Debug, Deserialize)]
pub struct AbortDownloadRequest {
    #[serde(default)]
    pub download_id: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

impl StartDownloadRequest {
    fn validate(&self) -> ApiResult<()> {
        let missing = [
            ("database", self.database.trim().is_empty()),
            ("query", self.query.trim().is_empty()),
            ("year", self.year.trim().is_empty()),
        ]
        .into_iter()
        .find(|(_, empty)| *empty);
        if let Some((field, _)) = missing {
            return Err(ApiError::BadRequest(format!("Missing field: {field}")));
        }
        if self.num_papers == 0 {
            return Err(ApiError::BadRequest("num_papers must be at least 1".into()));
        }
        if self.papers.is_empty() {
            return Err(ApiError::BadRequest("No papers to download.".into()));
        }
        Ok(())
    }
}

/// POST /api/downloads - Start a download job.
async fn start_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartDownloadRequest>,
) -> ApiResult<Json<StartDownloadResponse>> {
    body.validate()?;
    if state.jobs.is_running(JobKind::Download) {
        return Err(LaunchError::AlreadyRunning(JobKind::Download).into());
    }

    let request = DownloadRequest {
        database: body.database.trim().to_string(),
        query: body.query.trim().to_string(),
        year: body.year.trim().to_string(),
        num_papers: body.num_papers,
    };
    let output_dir = request.output_dir(&state.config.downloads_root);
    let source = ManualSource::new(request.database.clone(), body.papers);
    let log_dir = output_dir.clone();

    let id = state.jobs.launch(JobKind::Download, move |ctx| {
        // The blocking client must be built off the async runtime.
        let downloader = PaperDownloader::new()?;
        downloader.run(&ctx, &request, &source, &output_dir)?;
        Ok(())
    })?;
    record_job_launch(JobKind::Download);
    tracing::info!(download_id = %id, output = %log_dir.display(), "download started");
    Ok(Json(StartDownloadResponse { download_id: id }))
}

/// GET /api/downloads/progress?id=<uuid>
async fn download_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<JobSnapshot>> {
    jobs::progress(&state, JobKind::Download, &query.id).map(Json)
}

/// POST /api/downloads/abort
async fn abort_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AbortDownloadRequest>,
) -> ApiResult<Json<MessageResponse>> {
    jobs::abort(&state, JobKind::Download, &body.download_id, "Abort of download requested").map(Json)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/downloads", post(start_download))
        .route("/downloads/progress", get(download_progress))
        .route("/downloads/abort", post(abort_download))
}

// crates/server/src/routes/evaluation.rs
//! Evaluation job routes.
//!
//! - POST /evaluation          - Start an evaluation job
//! - GET  /evaluation/progress - Poll a job record (`?id=`)
//! - POST /evaluation/abort    - Request abort

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use facts_jobs::{JobId, JobKind, JobSnapshot, LaunchError};
use facts_pipeline::{resolve_under, EvaluationWorker, TermFrequencyModeler};

use super::jobs::{self, MessageResponse, ProgressQuery};
use crate::error::{ApiError, ApiResult};
use crate::metrics::record_job_launch;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartEvaluationRequest {
    /// Directory below the data root.
    #[serde(default)]
    pub data_directory: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StartEvaluationResponse {
    pub analysis_id: JobId,
}

#[derive(Debug, Deserialize)]
pub struct AbortEvaluationRequest {
    #[serde(default)]
    pub analysis_id: String,
}

/// POST /api/evaluation - Start an evaluation job.
async fn start_evaluation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartEvaluationRequest>,
) -> ApiResult<Json<StartEvaluationResponse>> {
    if body.data_directory.trim().is_empty() {
        return Err(ApiError::BadRequest("Please select a data directory.".into()));
    }
    let data_dir = resolve_under(&state.config.data_root, &body.data_directory)
        .filter(|p| p.is_dir())
        .ok_or_else(|| ApiError::BadRequest("The selected directory does not exist.".into()))?;
    if state.jobs.is_running(JobKind::Evaluation) {
        return Err(LaunchError::AlreadyRunning(JobKind::Evaluation).into());
    }

    let worker = EvaluationWorker::new(Box::new(TermFrequencyModeler::default()), state.locale());
    let analysis_root = state.config.analysis_root.clone();
    let job_dir = data_dir.clone();
    let id = state.jobs.launch(JobKind::Evaluation, move |ctx| {
        worker.run(&ctx, &job_dir, &analysis_root)?;
        Ok(())
    })?;
    record_job_launch(JobKind::Evaluation);
    tracing::info!(analysis_id = %id, data_dir = %data_dir.display(), "evaluation started");
    Ok(Json(StartEvaluationResponse { analysis_id: id }))
}

/// GET /api/evaluation/progress?id=<uuid>
async fn evaluation_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<JobSnapshot>> {
    jobs::progress(&state, JobKind::Evaluation, &query.id).map(Json)
}

/// POST /api/evaluation/abort
async fn abort_evaluation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AbortEvaluationRequest>,
) -> ApiResult<Json<MessageResponse>> {
    jobs::abort(
        &state,
        JobKind::Evaluation,
        &body.analysis_id,
        "Abort of evaluation requested",
    )
    .map(Json)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/evaluation", post(start_evaluation))
        .route("/evaluation/progress", get(evaluation_progress))
        .route("/evaluation/abort", post(abort_evaluation))
}

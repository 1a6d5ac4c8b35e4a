// crates/server/src/routes/analysis.rs
//! Extraction ("analysis") job routes.
//!
//! - POST /analysis          - Start an extraction job
//! - GET  /analysis/progress - Poll a job record (`?id=`)
//! - POST /analysis/abort    - Request abort

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use facts_core::{ChunkAnalyzer, QuestionSet};
use facts_jobs::{JobId, JobKind, JobSnapshot};
use facts_pipeline::{prepare_output, resolve_under, ExtractionWorker, PipelineError};

use super::jobs::{self, MessageResponse, ProgressQuery};
use crate::error::{ApiError, ApiResult};
use crate::metrics::record_job_launch;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartAnalysisRequest {
    /// Directory below the downloads root.
    #[serde(default)]
    pub pdf_directory: String,
    /// Newline-separated questions.
    #[serde(default)]
    pub questions: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StartAnalysisResponse {
    pub analysis_id: JobId,
}

#[derive(Debug, Deserialize)]
pub struct AbortAnalysisRequest {
    #[serde(default)]
    pub analysis_id: String,
}

/// POST /api/analysis - Start an extraction job.
///
/// Creates the output folder and `questions.txt` before the worker starts.
async fn start_analysis(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartAnalysisRequest>,
) -> ApiResult<Json<StartAnalysisResponse>> {
    let locale = state.locale();
    let questions = QuestionSet::parse(&body.questions, locale);
    let (questions, pdf_dir) = match (questions, body.pdf_directory.trim().is_empty()) {
        (Some(q), false) => {
            let dir = resolve_under(&state.config.downloads_root, &body.pdf_directory)
                .ok_or_else(|| ApiError::BadRequest("Invalid PDF directory.".into()))?;
            (q, dir)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide both a PDF directory and questions.".into(),
            ))
        }
    };
    if !pdf_dir.is_dir() {
        return Err(PipelineError::DirectoryNotFound { path: pdf_dir }.into());
    }
    // Hold the gate before touching the output folder.
    let reservation = state.jobs.reserve(JobKind::Extraction)?;

    let plan = prepare_output(
        &pdf_dir,
        &state.config.data_root,
        &questions,
        chrono::Local::now().date_naive(),
    )?;
    let pipeline = state.config.pipeline();
    let expected = questions.expected_count();
    let analyzer = ChunkAnalyzer::new(
        locale,
        questions,
        Arc::clone(&state.generator),
        pipeline.generator_timeout(),
    );
    let worker = ExtractionWorker::new(analyzer, Arc::clone(&state.extractor), pipeline.chunk_size);

    let id = reservation.launch(move |ctx| {
        worker.run(&ctx, &plan)?;
        Ok(())
    })?;
    record_job_launch(JobKind::Extraction);
    tracing::info!(
        analysis_id = %id,
        pdf_dir = %pdf_dir.display(),
        questions = expected,
        "analysis started"
    );
    Ok(Json(StartAnalysisResponse { analysis_id: id }))
}

/// GET /api/analysis/progress?id=<uuid>
async fn analysis_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<JobSnapshot>> {
    jobs::progress(&state, JobKind::Extraction, &query.id).map(Json)
}

/// POST /api/analysis/abort
async fn abort_analysis(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AbortAnalysisRequest>,
) -> ApiResult<Json<MessageResponse>> {
    jobs::abort(
        &state,
        JobKind::Extraction,
        &body.analysis_id,
        "Abort of data analysis requested",
    )
    .map(Json)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analysis", post(start_analysis))
        .route("/analysis/progress", get(analysis_progress))
        .route("/analysis/abort", post(abort_analysis))
}

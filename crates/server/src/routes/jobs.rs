// crates/server/src/routes/jobs.rs
//! Progress and abort plumbing shared by the three stage routers.

use serde::{Deserialize, Serialize};

use facts_jobs::{JobId, JobKind, JobSnapshot};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query string of the `GET .../progress?id=` endpoints.
#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(default)]
    pub id: String,
}

/// Body of the abort endpoints' responses.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct MessageResponse {
    pub message: String,
}

/// Parse `raw` and find the job. Ids of another kind count as unknown.
pub fn find_job(state: &AppState, kind: JobKind, raw: &str) -> ApiResult<(JobId, JobSnapshot)> {
    let id: JobId = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::JobNotFound(raw.to_string()))?;
    match state.jobs.get(id) {
        Some(snap) if snap.kind == kind => Ok((id, snap)),
        _ => Err(ApiError::JobNotFound(raw.to_string())),
    }
}

pub fn progress(state: &AppState, kind: JobKind, raw: &str) -> ApiResult<JobSnapshot> {
    find_job(state, kind, raw).map(|(_, snap)| snap)
}

/// Set the abort flag. `message` is returned on success.
pub fn abort(state: &AppState, kind: JobKind, raw: &str, message: &str) -> ApiResult<MessageResponse> {
    let (id, _) = find_job(state, kind, raw)?;
    if !state.jobs.request_abort(id) {
        return Err(ApiError::JobNotFound(raw.to_string()));
    }
    Ok(MessageResponse {
        message: message.to_string(),
    })
}

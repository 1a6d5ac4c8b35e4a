// crates/jobs/src/context.rs
//! Handle passed into a running job body.

use std::sync::Arc;

use super::error::JobError;
use super::state::JobState;
use super::types::{JobId, JobKind};

/// Worker-side view of a job. Cheap to clone.
#[derive(Clone)]
pub struct JobContext {
    state: Arc<JobState>,
}

impl JobContext {
    pub(crate) fn new(state: Arc<JobState>) -> Self {
        Self { state }
    }

    pub fn id(&self) -> JobId {
        self.state.id()
    }

    pub fn kind(&self) -> JobKind {
        self.state.kind()
    }

    /// Cooperative cancellation point. Returns `Err(JobError::Aborted)` once
    /// an abort has been requested, so bodies can use `ctx.checkpoint()?`.
    pub fn checkpoint(&self) -> Result<(), JobError> {
        if self.state.abort_requested() {
            Err(JobError::Aborted)
        } else {
            Ok(())
        }
    }

    pub fn abort_requested(&self) -> bool {
        self.state.abort_requested()
    }

    pub fn set_percent(&self, percent: u8) {
        self.state.set_percent(percent);
    }

    /// `floor(done / total * 100)`, or 0 when there is nothing to do.
    pub fn set_progress(&self, done: usize, total: usize) {
        self.state.set_percent(percent_of(done, total, 100));
    }

    pub fn set_folder(&self, folder: impl Into<String>) {
        self.state.set_folder(folder);
    }

    pub fn set_result(&self, result: impl Into<String>) {
        self.state.set_result(result);
    }
}

/// `floor(done / total * span)`, saturating at `span`.
pub fn percent_of(done: usize, total: usize, span: u8) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total) as u128;
    ((done * span as u128) / total as u128) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> (Arc<JobState>, JobContext) {
        let state = Arc::new(JobState::new(uuid::Uuid::new_v4(), JobKind::Download));
        (state.clone(), JobContext::new(state))
    }

    #[test]
    fn test_checkpoint_follows_abort_flag() {
        let (state, ctx) = ctx();
        assert_eq!(ctx.checkpoint(), Ok(()));
        state.request_abort();
        assert_eq!(ctx.checkpoint(), Err(JobError::Aborted));
    }

    #[test]
    fn test_progress_floors() {
        let (state, ctx) = ctx();
        ctx.set_progress(1, 3);
        assert_eq!(state.percent(), 33);
        ctx.set_progress(2, 3);
        assert_eq!(state.percent(), 66);
        ctx.set_progress(3, 3);
        assert_eq!(state.percent(), 100);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 0, 100), 0);
        assert_eq!(percent_of(1, 2, 80), 40);
        assert_eq!(percent_of(5, 3, 100), 100);
        assert_eq!(percent_of(1, 7, 80), 11);
    }
}

// crates/jobs/src/error.rs
use thiserror::Error;

use super::types::JobKind;

/// How a job body ended when it did not complete.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    /// The abort flag was observed at a checkpoint.
    #[error("job aborted")]
    Aborted,

    #[error("{0}")]
    Failed(String),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Why a job could not be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{0} job is already running")]
    AlreadyRunning(JobKind),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(JobError::Aborted.to_string(), "job aborted");
        assert_eq!(
            JobError::failed("No valid answers found").to_string(),
            "No valid answers found"
        );
        assert_eq!(
            LaunchError::AlreadyRunning(JobKind::Download).to_string(),
            "download job is already running"
        );
    }
}

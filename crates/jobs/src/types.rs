// crates/jobs/src/types.rs
//! Types for the background job system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a launched job.
pub type JobId = uuid::Uuid;

/// The three long-running stages. At most one job of each kind runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JobKind {
    Download = 0,
    Extraction = 1,
    Evaluation = 2,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Download, JobKind::Extraction, JobKind::Evaluation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Extraction => "extraction",
            Self::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a job. `Completed`, `Error` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JobStatus {
    Starting = 0,
    Running = 1,
    Completed = 2,
    Error = 3,
    Aborted = 4,
}

impl JobStatus {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Error,
            4 => Self::Aborted,
            _ => Self::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Aborted)
    }
}

/// Point-in-time copy of a job record, as served to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct JobSnapshot {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub percent: u8,
    pub abort: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_discriminants() {
        assert_eq!(JobStatus::Starting as u8, 0);
        assert_eq!(JobStatus::Running as u8, 1);
        assert_eq!(JobStatus::Completed as u8, 2);
        assert_eq!(JobStatus::Error as u8, 3);
        assert_eq!(JobStatus::Aborted as u8, 4);
        for status in [
            JobStatus::Starting,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Error,
            JobStatus::Aborted,
        ] {
            assert_eq!(JobStatus::from_u8(status as u8), status);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Starting.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Aborted.is_terminal());
    }

    #[test]
    fn test_job_kind_serde() {
        assert_eq!(serde_json::to_string(&JobKind::Extraction).unwrap(), "\"extraction\"");
        assert_eq!(JobKind::Download.to_string(), "download");
    }

    #[test]
    fn test_snapshot_serialize_skips_empty_fields() {
        let snap = JobSnapshot {
            id: uuid::Uuid::nil(),
            kind: JobKind::Evaluation,
            status: JobStatus::Running,
            percent: 42,
            abort: false,
            error: None,
            folder: Some("evaluation_20260101_120000".into()),
            result: None,
            started_at: "2026-01-01T12:00:00Z".into(),
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"status\":\"running\""));
        assert!(json.contains("\"percent\":42"));
        assert!(json.contains("\"folder\":\"evaluation_20260101_120000\""));
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"result\""));
    }
}

// crates/jobs/src/state.rs
//! Atomic state for a single job.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::RwLock;

use super::types::{JobId, JobKind, JobSnapshot, JobStatus};

/// Lock-free job record.
///
/// Status, percent and the abort latch are atomics so pollers never block
/// the worker. Only the string fields use a RwLock. Everything except
/// `abort` is written by the worker thread alone.
pub struct JobState {
    id: JobId,
    kind: JobKind,
    status: AtomicU8,
    percent: AtomicU8,
    abort: AtomicBool,
    error: RwLock<Option<String>>,
    folder: RwLock<Option<String>>,
    result: RwLock<Option<String>>,
    started_at: String,
}

impl JobState {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            status: AtomicU8::new(JobStatus::Starting as u8),
            percent: AtomicU8::new(0),
            abort: AtomicBool::new(false),
            error: RwLock::new(None),
            folder: RwLock::new(None),
            result: RwLock::new(None),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }

    /// `Starting -> Running`. No-op in any other state.
    pub fn set_running(&self) {
        let _ = self.status.compare_exchange(
            JobStatus::Starting as u8,
            JobStatus::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Raise the percentage. Values never go down and are capped at 100.
    pub fn set_percent(&self, percent: u8) {
        self.percent.fetch_max(percent.min(100), Ordering::Relaxed);
    }

    /// Set the abort latch. It cannot be cleared.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn set_folder(&self, folder: impl Into<String>) {
        match self.folder.write() {
            Ok(mut guard) => *guard = Some(folder.into()),
            Err(e) => tracing::error!("RwLock poisoned writing folder: {e}"),
        }
    }

    pub fn set_result(&self, result: impl Into<String>) {
        match self.result.write() {
            Ok(mut guard) => *guard = Some(result.into()),
            Err(e) => tracing::error!("RwLock poisoned writing result: {e}"),
        }
    }

    /// Move into a terminal state. Returns false if the job had already
    /// finished; terminal states are never overwritten.
    pub fn finish(&self, status: JobStatus, error: Option<String>) -> bool {
        debug_assert!(status.is_terminal());
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if JobStatus::from_u8(current).is_terminal() {
                return false;
            }
            match self.status.compare_exchange_weak(
                current,
                status as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        if let Some(msg) = error {
            match self.error.write() {
                Ok(mut guard) => *guard = Some(msg),
                Err(e) => tracing::error!("RwLock poisoned writing error: {e}"),
            }
        }
        if status == JobStatus::Completed {
            self.percent.store(100, Ordering::Relaxed);
        }
        true
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            kind: self.kind,
            status: self.status(),
            percent: self.percent(),
            abort: self.abort_requested(),
            error: read_opt(&self.error, "error"),
            folder: read_opt(&self.folder, "folder"),
            result: read_opt(&self.result, "result"),
            started_at: self.started_at.clone(),
        }
    }
}

fn read_opt(lock: &RwLock<Option<String>>, field: &str) -> Option<String> {
    match lock.read() {
        Ok(g) => g.clone(),
        Err(e) => {
            tracing::error!(field, "RwLock poisoned reading job field: {e}");
            None
        }
    }
}

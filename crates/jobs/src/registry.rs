// crates/jobs/src/registry.rs
//! Registry that launches jobs and answers status polls.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};

use super::context::JobContext;
use super::error::{JobError, LaunchError};
use super::state::JobState;
use super::types::{JobId, JobKind, JobSnapshot, JobStatus};

/// Launches background jobs with at most one running job per [`JobKind`].
///
/// Job bodies are blocking (subprocesses, PDF parsing, file I/O) so each one
/// gets a dedicated OS thread. Records stay in the registry after the job
/// ends so late polls still see the terminal state.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobState>>>,
    gates: Mutex<[bool; 3]>,
}

/// Releases the per-kind gate when the worker exits, including on panic.
struct GateGuard {
    registry: Arc<JobRegistry>,
    kind: JobKind,
    released: bool,
}

impl GateGuard {
    /// Run `publish` while holding the gate lock, then open the gate. A
    /// launch racing with this sees either the gate held or the job's
    /// terminal state already published.
    fn release_with(mut self, publish: impl FnOnce()) {
        {
            let mut gates = self.registry.lock_gates();
            publish();
            gates[self.kind as usize] = false;
        }
        self.released = true;
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        if !self.released {
            self.registry.release(self.kind);
        }
    }
}

/// A per-kind gate taken ahead of the worker, so callers can prepare
/// output folders without racing another launch. Dropping it without
/// calling [`Reservation::launch`] opens the gate again.
pub struct Reservation {
    guard: GateGuard,
}

impl Reservation {
    pub fn kind(&self) -> JobKind {
        self.guard.kind
    }

    /// Create the job record and start `body` on a new thread.
    pub fn launch<F>(self, body: F) -> Result<JobId, LaunchError>
    where
        F: FnOnce(JobContext) -> Result<(), JobError> + Send + 'static,
    {
        let guard = self.guard;
        let registry = Arc::clone(&guard.registry);
        let kind = guard.kind;

        let id = uuid::Uuid::new_v4();
        let state = Arc::new(JobState::new(id, kind));
        match registry.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(id, Arc::clone(&state));
            }
            Err(e) => tracing::error!("RwLock poisoned writing jobs map: {e}"),
        }

        let worker_state = Arc::clone(&state);
        let spawned = std::thread::Builder::new()
            .name(format!("facts-{kind}"))
            .spawn(move || run_job(worker_state, guard, body));

        match spawned {
            Ok(_) => {
                tracing::info!(job_id = %id, kind = %kind, "job launched");
                Ok(id)
            }
            Err(e) => {
                // The closure (and the guard inside it) was dropped, so the
                // gate is already open again.
                state.finish(JobStatus::Error, Some(e.to_string()));
                Err(LaunchError::Spawn(e.to_string()))
            }
        }
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            gates: Mutex::new([false; 3]),
        }
    }

    /// Take the gate for `kind` without starting anything yet.
    ///
    /// Fails with [`LaunchError::AlreadyRunning`] while another job of the
    /// same kind holds it.
    pub fn reserve(self: &Arc<Self>, kind: JobKind) -> Result<Reservation, LaunchError> {
        if !self.try_acquire(kind) {
            return Err(LaunchError::AlreadyRunning(kind));
        }
        Ok(Reservation {
            guard: GateGuard {
                registry: Arc::clone(self),
                kind,
                released: false,
            },
        })
    }

    /// Start `body` on a new thread as a job of `kind`.
    ///
    /// Fails with [`LaunchError::AlreadyRunning`] while another job of the
    /// same kind is still in progress; in that case no record is created.
    pub fn launch<F>(self: &Arc<Self>, kind: JobKind, body: F) -> Result<JobId, LaunchError>
    where
        F: FnOnce(JobContext) -> Result<(), JobError> + Send + 'static,
    {
        self.reserve(kind)?.launch(body)
    }

    /// Current snapshot of a job, or `None` for an unknown id.
    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(&id).map(|s| s.snapshot()),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Set the abort flag of a job. Returns false for an unknown id.
    ///
    /// Aborting a job that already finished is accepted and changes nothing.
    pub fn request_abort(&self, id: JobId) -> bool {
        let state = match self.jobs.read() {
            Ok(jobs) => jobs.get(&id).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        };
        match state {
            Some(state) => {
                state.request_abort();
                tracing::info!(job_id = %id, kind = %state.kind(), "abort requested");
                true
            }
            None => false,
        }
    }

    /// Whether a job of `kind` currently holds its gate.
    pub fn is_running(&self, kind: JobKind) -> bool {
        self.lock_gates()[kind as usize]
    }

    fn try_acquire(&self, kind: JobKind) -> bool {
        let mut gates = self.lock_gates();
        let slot = &mut gates[kind as usize];
        if *slot {
            false
        } else {
            *slot = true;
            true
        }
    }

    fn release(&self, kind: JobKind) {
        self.lock_gates()[kind as usize] = false;
    }

    fn lock_gates(&self) -> std::sync::MutexGuard<'_, [bool; 3]> {
        // A panic while holding this lock cannot leave the array half-written.
        self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn run_job<F>(state: Arc<JobState>, guard: GateGuard, body: F)
where
    F: FnOnce(JobContext) -> Result<(), JobError>,
{
    state.set_running();
    let ctx = JobContext::new(Arc::clone(&state));
    let outcome = catch_unwind(AssertUnwindSafe(|| body(ctx)));

    let (status, error) = match outcome {
        Ok(Ok(())) => (JobStatus::Completed, None),
        Ok(Err(JobError::Aborted)) => (JobStatus::Aborted, None),
        Ok(Err(JobError::Failed(msg))) if state.abort_requested() => {
            tracing::debug!(job_id = %state.id(), "failure after abort request: {msg}");
            (JobStatus::Aborted, None)
        }
        Ok(Err(JobError::Failed(msg))) => (JobStatus::Error, Some(msg)),
        Err(panic) => (JobStatus::Error, Some(panic_message(panic.as_ref()))),
    };

    match status {
        JobStatus::Error => tracing::error!(
            job_id = %state.id(),
            kind = %state.kind(),
            error = error.as_deref().unwrap_or_default(),
            "job failed"
        ),
        _ => tracing::info!(
            job_id = %state.id(),
            kind = %state.kind(),
            status = status.as_str(),
            "job finished"
        ),
    }
    guard.release_with(|| {
        state.finish(status, error);
    });
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("worker panicked: {s}")
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn wait_terminal(registry: &JobRegistry, id: JobId) -> JobSnapshot {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let snap = registry.get(id).expect("job exists");
            if snap.status.is_terminal() {
                return snap;
            }
            assert!(Instant::now() < deadline, "job did not finish in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_job_completes() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .launch(JobKind::Extraction, |ctx| {
                ctx.set_progress(1, 2);
                ctx.set_folder("out");
                ctx.set_result("3 papers processed");
                Ok(())
            })
            .unwrap();

        let snap = wait_terminal(&registry, id);
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.percent, 100);
        assert_eq!(snap.folder.as_deref(), Some("out"));
        assert_eq!(snap.result.as_deref(), Some("3 papers processed"));
        assert!(!registry.is_running(JobKind::Extraction));
    }

    #[test]
    fn test_same_kind_is_rejected_while_running() {
        let registry = Arc::new(JobRegistry::new());
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let first = registry
            .launch(JobKind::Download, move |_ctx| {
                let _ = release_rx.recv();
                Ok(())
            })
            .unwrap();

        assert!(registry.is_running(JobKind::Download));
        let err = registry.launch(JobKind::Download, |_ctx| Ok(())).unwrap_err();
        assert!(matches!(err, LaunchError::AlreadyRunning(JobKind::Download)));
        assert_eq!(registry.jobs.read().unwrap().len(), 1);

        // Other kinds are independent.
        let other = registry.launch(JobKind::Evaluation, |_ctx| Ok(())).unwrap();
        wait_terminal(&registry, other);

        release_tx.send(()).unwrap();
        assert_eq!(wait_terminal(&registry, first).status, JobStatus::Completed);
        assert!(registry.launch(JobKind::Download, |_ctx| Ok(())).is_ok());
    }

    #[test]
    fn test_failure_records_error() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .launch(JobKind::Evaluation, |_ctx| Err(JobError::failed("No texts found")))
            .unwrap();
        let snap = wait_terminal(&registry, id);
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(snap.error.as_deref(), Some("No texts found"));
    }

    #[test]
    fn test_panic_becomes_error_and_frees_gate() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .launch(JobKind::Extraction, |_ctx| panic!("boom"))
            .unwrap();
        let snap = wait_terminal(&registry, id);
        assert_eq!(snap.status, JobStatus::Error);
        assert_eq!(snap.error.as_deref(), Some("worker panicked: boom"));
        assert!(!registry.is_running(JobKind::Extraction));
    }

    #[test]
    fn test_gate_opens_only_after_terminal_state() {
        let registry = Arc::new(JobRegistry::new());
        for _ in 0..200 {
            let id = registry.launch(JobKind::Download, |_ctx| Ok(())).unwrap();
            while registry.is_running(JobKind::Download) {
                std::hint::spin_loop();
            }
            assert!(registry.get(id).unwrap().status.is_terminal());
        }
    }

    #[test]
    fn test_reservation_holds_gate_until_dropped() {
        let registry = Arc::new(JobRegistry::new());
        let reservation = registry.reserve(JobKind::Extraction).unwrap();
        assert_eq!(reservation.kind(), JobKind::Extraction);
        assert!(registry.is_running(JobKind::Extraction));
        assert!(matches!(
            registry.launch(JobKind::Extraction, |_ctx| Ok(())),
            Err(LaunchError::AlreadyRunning(JobKind::Extraction))
        ));
        assert!(registry.jobs.read().unwrap().is_empty());

        drop(reservation);
        assert!(!registry.is_running(JobKind::Extraction));

        let id = registry.reserve(JobKind::Extraction).unwrap().launch(|_ctx| Ok(())).unwrap();
        assert_eq!(wait_terminal(&registry, id).status, JobStatus::Completed);
    }

    #[test]
    fn test_unknown_id() {
        let registry = JobRegistry::new();
        let id = uuid::Uuid::new_v4();
        assert!(registry.get(id).is_none());
        assert!(!registry.request_abort(id));
    }
}

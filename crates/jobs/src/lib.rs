// crates/jobs/src/lib.rs
//! Background job coordination: one running job per kind, cooperative
//! abort flags and pollable status records.

pub mod context;
pub mod error;
pub mod registry;
pub mod state;
pub mod types;

pub use context::{percent_of, JobContext};
pub use error::{JobError, LaunchError};
pub use registry::{JobRegistry, Reservation};
pub use state::JobState;
pub use types::{JobId, JobKind, JobSnapshot, JobStatus};

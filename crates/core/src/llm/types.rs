// crates/core/src/llm/types.rs
//! Errors and constants for generator calls.

use std::time::Duration;
use thiserror::Error;

/// Raw output returned in place of real output when a call times out.
pub const TIMEOUT_OUTPUT: &str = "Timeout for the model request";

/// Default hard limit for one generator call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Default generator command line.
pub const DEFAULT_GENERATOR_COMMAND: &str = "ollama run llama3.1p";

/// Errors that abort a generator call outright.
///
/// Timeouts and non-zero exits are not errors: they degrade to
/// [`TIMEOUT_OUTPUT`] and empty output so only one chunk is affected.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to spawn generator process: {0}")]
    SpawnFailed(String),

    #[error("Generator IO error: {0}")]
    Io(String),

    #[error("Generator not available: {0}")]
    NotAvailable(String),

    #[error("Invalid generator command: {0}")]
    InvalidCommand(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

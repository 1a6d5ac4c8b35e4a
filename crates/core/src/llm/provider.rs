// crates/core/src/llm/provider.rs
//! GenerationClient trait defining the interface to the external model.

use std::time::Duration;

use super::types::GenerationError;

/// A blocking, prompt-in / text-out model client.
///
/// Called from dedicated worker threads, never from the async runtime.
///
/// Implementations include:
/// - `CommandClient` - pipes the prompt to a local CLI (`ollama run ...`)
pub trait GenerationClient: Send + Sync {
    /// Send one prompt and return the raw output.
    ///
    /// On timeout the call returns [`super::TIMEOUT_OUTPUT`]; on a failed
    /// run it returns an empty string. `Err` is reserved for failures that
    /// make every further call pointless (the process cannot start).
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError>;

    /// Check that the generator can be reached at all.
    fn health_check(&self) -> Result<(), GenerationError>;

    /// Client name for logging/display (e.g. "ollama-cli").
    fn name(&self) -> &str;

    /// Model identifier (e.g. "llama3.1p").
    fn model(&self) -> &str;
}

// crates/core/src/llm/mod.rs
//! Generator gateway.
//!
//! Provides the `GenerationClient` trait and a subprocess implementation
//! that talks to a local model CLI.

pub mod command;
pub mod provider;
pub mod types;

pub use command::{strip_ansi, CommandClient};
pub use provider::GenerationClient;
pub use types::{
    GenerationError, DEFAULT_GENERATION_TIMEOUT, DEFAULT_GENERATOR_COMMAND, TIMEOUT_OUTPUT,
};

// crates/core/src/config.rs
//! Per-run pipeline settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::llm::DEFAULT_GENERATION_TIMEOUT;
use crate::locale::Language;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub language: Language,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    pub generator_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            generator_timeout_secs: DEFAULT_GENERATION_TIMEOUT.as_secs(),
        }
    }
}

impl PipelineConfig {
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}

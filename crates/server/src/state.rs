// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use facts_core::llm::{CommandClient, GenerationClient, GenerationError};
use facts_core::{Locale, PdfTextExtractor, TextExtractor};
use facts_jobs::JobRegistry;

use crate::config::ServerConfig;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub config: ServerConfig,
    /// Job records and per-kind gates for all three stages.
    pub jobs: Arc<JobRegistry>,
    /// Generator used by extraction jobs.
    pub generator: Arc<dyn GenerationClient>,
    pub extractor: Arc<dyn TextExtractor>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        generator: Arc<dyn GenerationClient>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            config,
            jobs: Arc::new(JobRegistry::new()),
            generator,
            extractor,
        })
    }

    /// State with the subprocess generator from `config.generator_command`
    /// and the `pdf-extract` backed extractor.
    pub fn from_config(config: ServerConfig) -> Result<Arc<Self>, GenerationError> {
        let generator = CommandClient::from_command_line(&config.generator_command)?;
        Ok(Self::new(config, Arc::new(generator), Arc::new(PdfTextExtractor)))
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn locale(&self) -> &'static Locale {
        self.config.locale.locale()
    }
}

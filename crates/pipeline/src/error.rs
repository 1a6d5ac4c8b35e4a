// crates/pipeline/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use facts_core::llm::GenerationError;
use facts_core::{PdfError, ResultsError};
use facts_jobs::JobError;

/// Failures of the stage workers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An abort was observed at a checkpoint.
    #[error("aborted")]
    Aborted,

    #[error("PDF directory does not exist: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("No PDF files found.")]
    NoPdfFiles,

    #[error("No document could be processed")]
    NoDocumentProcessed,

    #[error("No texts found")]
    NoTexts,

    #[error("No valid answers found")]
    NoValidAnswers,

    #[error("No hits found for year {year} or no valid PDFs downloaded.")]
    NothingDownloaded { year: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    #[error("paper source {source_name} failed: {message}")]
    Source { source_name: String, message: String },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn http(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Http {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

impl From<JobError> for PipelineError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Aborted => Self::Aborted,
            JobError::Failed(msg) => Self::Failed(msg),
        }
    }
}

impl From<PipelineError> for JobError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Aborted => JobError::Aborted,
            other => JobError::Failed(other.to_string()),
        }
    }
}

// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a PDF into text.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading PDF: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not extract text from {path}: {message}")]
    Extract { path: PathBuf, message: String },
}

impl PdfError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors raised while writing or re-reading persisted result files.
#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("Results directory not found: {path}")]
    DirNotFound { path: PathBuf },

    #[error("Permission denied accessing {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResultsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::DirNotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

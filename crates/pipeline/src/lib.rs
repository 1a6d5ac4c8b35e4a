// crates/pipeline/src/lib.rs
//! The three stage workers: download, extraction and evaluation. Each runs
//! inside a job launched by `facts-jobs` and reports through its
//! `JobContext`.

pub mod download;
pub mod error;
pub mod evaluation;
pub mod extraction;
pub mod metrics;
pub mod paths;

pub use download::{DownloadRequest, ManualSource, PaperDownloader, PaperRecord, PaperSource};
pub use error::PipelineError;
pub use evaluation::{EvaluationWorker, TermFrequencyModeler, TopicModeler, TopicSummary};
pub use extraction::{prepare_output, DocumentReport, ExtractionPlan, ExtractionWorker};
pub use paths::{list_subdirectories, resolve_under, upload_dir, uploaded_pdf_name};

// crates/core/src/lib.rs
//! Extraction-and-validation core: text cleanup, sentence chunking, the
//! generator protocol, response parsing, grounding checks and the result
//! file format.

pub mod analyzer;
pub mod chunker;
pub mod config;
pub mod error;
pub mod llm;
pub mod locale;
pub mod parser;
pub mod pdf;
pub mod prompt;
pub mod questions;
pub mod results;
pub mod text;
pub mod validator;

pub use analyzer::ChunkAnalyzer;
pub use chunker::{chunk_text, split_sentences, DEFAULT_CHUNK_SIZE};
pub use config::PipelineConfig;
pub use error::{PdfError, ResultsError};
pub use locale::{Language, Locale, NO_ANSWER_MARKER};
pub use parser::{parse_response, AnswerBlock, BlockStatus};
pub use pdf::{is_pdf_file, ExtractedText, PdfTextExtractor, TextExtractor};
pub use prompt::PromptBuilder;
pub use questions::QuestionSet;
pub use results::{answers_by_question, read_result_file, ResultSection, ResultWriter};
pub use text::{clean_text, CleanOptions};
pub use validator::{validate_block, RejectReason, Resolution};

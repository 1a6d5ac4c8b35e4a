// crates/pipeline/src/extraction.rs
//! Extraction stage: PDFs in, one validated result file per document out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use facts_core::{
    chunk_text, clean_text, ChunkAnalyzer, CleanOptions, QuestionSet, ResultWriter, TextExtractor,
};
use facts_jobs::JobContext;

use crate::error::PipelineError;
use crate::metrics;
use crate::paths::{self, QUESTIONS_FILE};

/// Everything resolved at launch time, before the worker thread starts.
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub pdf_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Create the output folder and write `questions.txt` into it.
///
/// Runs synchronously in the launching request so a bad data root is
/// reported to the caller instead of ending up in the job record.
pub fn prepare_output(
    pdf_dir: &Path,
    data_root: &Path,
    questions: &QuestionSet,
    date: chrono::NaiveDate,
) -> Result<ExtractionPlan, PipelineError> {
    let output_dir = paths::extraction_output_dir(data_root, pdf_dir, date);
    std::fs::create_dir_all(&output_dir).map_err(|e| PipelineError::io(&output_dir, e))?;
    let questions_path = output_dir.join(QUESTIONS_FILE);
    std::fs::write(&questions_path, questions.to_file_contents())
        .map_err(|e| PipelineError::io(&questions_path, e))?;
    Ok(ExtractionPlan {
        pdf_dir: pdf_dir.to_path_buf(),
        output_dir,
    })
}

/// Outcome for one processed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub sections: usize,
    pub accepted: usize,
}

impl DocumentReport {
    pub fn summary_line(&self) -> String {
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "Analysis for {name} completed (result in {}).",
            self.output.display()
        )
    }
}

pub struct ExtractionWorker {
    analyzer: ChunkAnalyzer,
    extractor: Arc<dyn TextExtractor>,
    chunk_size: usize,
    clean: CleanOptions,
}

impl ExtractionWorker {
    pub fn new(analyzer: ChunkAnalyzer, extractor: Arc<dyn TextExtractor>, chunk_size: usize) -> Self {
        Self {
            analyzer,
            extractor,
            chunk_size,
            clean: CleanOptions::default(),
        }
    }

    pub fn with_clean_options(mut self, clean: CleanOptions) -> Self {
        self.clean = clean;
        self
    }

    /// Process every PDF of the plan in file-name order.
    ///
    /// A document that fails is logged and skipped; the job fails only when
    /// no document could be processed.
    pub fn run(&self, ctx: &JobContext, plan: &ExtractionPlan) -> Result<(), PipelineError> {
        if !plan.pdf_dir.is_dir() {
            return Err(PipelineError::DirectoryNotFound {
                path: plan.pdf_dir.clone(),
            });
        }
        let pdfs = paths::files_with_extension(&plan.pdf_dir, "pdf")?;
        if pdfs.is_empty() {
            return Err(PipelineError::NoPdfFiles);
        }
        ctx.set_folder(plan.output_dir.display().to_string());

        let total = pdfs.len();
        tracing::info!(
            job_id = %ctx.id(),
            pdf_dir = %plan.pdf_dir.display(),
            documents = total,
            questions = self.analyzer.expected_count(),
            "extraction started"
        );

        let mut reports = Vec::with_capacity(total);
        for (idx, pdf) in pdfs.iter().enumerate() {
            ctx.checkpoint()?;
            let output = plan.output_dir.join(paths::result_file_name(idx + 1));
            tracing::info!(document = %pdf.display(), "processing {}/{}", idx + 1, total);

            match self.process_document(ctx, pdf, &output) {
                Ok(report) => {
                    metrics::record_document("ok");
                    reports.push(report);
                }
                Err(PipelineError::Aborted) => return Err(PipelineError::Aborted),
                Err(e) => {
                    metrics::record_document("failed");
                    tracing::error!(document = %pdf.display(), error = %e, "document failed, skipping");
                }
            }
            ctx.set_progress(idx + 1, total);
        }

        if reports.is_empty() {
            return Err(PipelineError::NoDocumentProcessed);
        }
        let summary: Vec<String> = reports.iter().map(DocumentReport::summary_line).collect();
        ctx.set_result(summary.join("\n"));
        Ok(())
    }

    /// Extract, clean and chunk one PDF, then write one result section per
    /// chunk. Each section is flushed before the next chunk starts, so an
    /// abort leaves every completed section on disk.
    pub fn process_document(
        &self,
        ctx: &JobContext,
        pdf: &Path,
        output: &Path,
    ) -> Result<DocumentReport, PipelineError> {
        let started = Instant::now();
        let extracted = self.extractor.extract(pdf, &|| ctx.abort_requested())?;
        ctx.checkpoint()?;

        let cleaned = clean_text(&extracted.text, self.clean);
        let chunks = chunk_text(&cleaned, self.chunk_size);
        tracing::debug!(
            document = %pdf.display(),
            pages = extracted.page_count,
            chars = cleaned.chars().count(),
            chunks = chunks.len(),
            "document prepared"
        );

        let mut writer = ResultWriter::create(output, self.analyzer.locale())?;
        let mut accepted = 0;

        if chunks.is_empty() {
            writer.append_section(1, &self.analyzer.empty_chunk())?;
        }
        for (idx, chunk) in chunks.iter().enumerate() {
            ctx.checkpoint()?;
            let section = idx + 1;
            let chunk_started = Instant::now();
            let resolutions = self.analyzer.analyze(section, chunk)?;
            metrics::record_chunk(chunk_started.elapsed());
            accepted += resolutions.iter().filter(|r| r.is_answered()).count();
            writer.append_section(section, &resolutions)?;
        }

        tracing::info!(
            document = %pdf.display(),
            sections = writer.sections_written(),
            accepted,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "document analyzed"
        );
        Ok(DocumentReport {
            source: pdf.to_path_buf(),
            output: output.to_path_buf(),
            sections: writer.sections_written(),
            accepted,
        })
    }
}

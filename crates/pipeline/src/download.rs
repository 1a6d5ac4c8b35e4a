// crates/pipeline/src/download.rs
//! Download stage: fetch paper PDFs from a source into a local folder.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use facts_core::pdf::is_pdf_file;
use facts_jobs::JobContext;

use crate::error::PipelineError;
use crate::metrics;
use crate::paths::{self, REFERENCES_FILE};

const READ_BUFFER: usize = 16 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("facts/", env!("CARGO_PKG_VERSION"));

/// Bibliographic record of one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<String>,
    pub pdf_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_url: Option<String>,
}

impl PaperRecord {
    /// `<authors> (<year>). <title>. <database>. Retrieved from <url>`
    pub fn apa_reference(&self, database: &str) -> String {
        let authors = match self.authors.as_slice() {
            [] => "Unknown author".to_string(),
            [one] => one.clone(),
            [init @ .., last] => format!("{}, & {}", init.join(", "), last),
        };
        let year = self.year.as_deref().unwrap_or("n.d.");
        let title = if self.title.trim().is_empty() {
            "No title"
        } else {
            self.title.trim()
        };
        let url = self.landing_url.as_deref().unwrap_or(&self.pdf_url);
        format!("{authors} ({year}). {title}. {database}. Retrieved from {url}")
    }
}

/// A searchable collection of papers.
pub trait PaperSource: Send + Sync {
    fn name(&self) -> &str;

    /// Up to `limit` records matching `query` and `year`.
    fn search(&self, query: &str, year: &str, limit: usize) -> Result<Vec<PaperRecord>, PipelineError>;
}

/// Serves records supplied by the caller, for example a list of direct PDF
/// links.
#[derive(Debug, Clone)]
pub struct ManualSource {
    name: String,
    records: Vec<PaperRecord>,
}

impl ManualSource {
    pub fn new(name: impl Into<String>, records: Vec<PaperRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

impl PaperSource for ManualSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, _query: &str, _year: &str, limit: usize) -> Result<Vec<PaperRecord>, PipelineError> {
        Ok(self.records.iter().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub database: String,
    pub query: String,
    pub year: String,
    pub num_papers: usize,
}

impl DownloadRequest {
    pub fn output_dir(&self, downloads_root: &Path) -> PathBuf {
        paths::download_dir(downloads_root, &self.database, &self.query, &self.year)
    }
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Saved(PathBuf),
    /// The body was not a PDF; kept next to the others with `.html` appended.
    NotPdf(PathBuf),
    Failed(String),
}

pub struct PaperDownloader {
    client: reqwest::blocking::Client,
}

impl PaperDownloader {
    pub fn new() -> Result<Self, PipelineError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::http("client", e))?;
        Ok(Self { client })
    }

    /// Download up to `request.num_papers` records from `source` into
    /// `output_dir`, then append the numbered references of every saved
    /// paper to `source_references.txt`.
    pub fn run(
        &self,
        ctx: &JobContext,
        request: &DownloadRequest,
        source: &dyn PaperSource,
        output_dir: &Path,
    ) -> Result<usize, PipelineError> {
        std::fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;
        ctx.set_folder(output_dir.display().to_string());

        let records = source.search(&request.query, &request.year, request.num_papers)?;
        tracing::info!(
            job_id = %ctx.id(),
            source = source.name(),
            query = %request.query,
            year = %request.year,
            found = records.len(),
            "download started"
        );

        let prefix = paths::sanitize_component(&request.database);
        let mut references = Vec::new();
        let mut outcome = Ok(());
        for (idx, record) in records.iter().take(request.num_papers).enumerate() {
            if let Err(e) = ctx.checkpoint() {
                outcome = Err(e.into());
                break;
            }
            let target = output_dir.join(format!("{prefix}_{}.pdf", idx + 1));
            match self.fetch(ctx, &record.pdf_url, &target) {
                Ok(FetchOutcome::Saved(path)) => {
                    metrics::record_download("saved");
                    tracing::info!(path = %path.display(), "PDF saved");
                    references.push(record.apa_reference(&request.database));
                    ctx.set_progress(references.len(), request.num_papers);
                }
                Ok(FetchOutcome::NotPdf(path)) => {
                    metrics::record_download("not_pdf");
                    tracing::warn!(url = %record.pdf_url, kept_as = %path.display(), "response is not a PDF");
                }
                Ok(FetchOutcome::Failed(msg)) => {
                    metrics::record_download("failed");
                    tracing::error!(url = %record.pdf_url, "download failed: {msg}");
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        // References of papers saved before an abort are still written.
        append_references(&output_dir.join(REFERENCES_FILE), &references)?;
        outcome?;

        if references.is_empty() {
            return Err(PipelineError::NothingDownloaded {
                year: request.year.clone(),
            });
        }
        ctx.set_result(format!("{} papers downloaded", references.len()));
        Ok(references.len())
    }

    /// Stream one URL to `target`, checking the abort flag between body
    /// reads. An aborted partial file is removed.
    ///
    /// Only abort and local I/O errors are returned as `Err`; network and
    /// HTTP failures are reported as [`FetchOutcome::Failed`].
    pub fn fetch(&self, ctx: &JobContext, url: &str, target: &Path) -> Result<FetchOutcome, PipelineError> {
        let mut response = match self.client.get(url).send().and_then(|r| r.error_for_status()) {
            Ok(r) => r,
            Err(e) => return Ok(FetchOutcome::Failed(e.to_string())),
        };

        let mut file = File::create(target).map_err(|e| PipelineError::io(target, e))?;
        let mut buf = vec![0u8; READ_BUFFER];
        let mut written = 0usize;
        loop {
            if ctx.abort_requested() {
                drop(file);
                let _ = std::fs::remove_file(target);
                tracing::info!(url, "abort detected during download, partial file removed");
                return Err(PipelineError::Aborted);
            }
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    drop(file);
                    let _ = std::fs::remove_file(target);
                    return Ok(FetchOutcome::Failed(e.to_string()));
                }
            };
            file.write_all(&buf[..n]).map_err(|e| PipelineError::io(target, e))?;
            written += n;
        }
        file.flush().map_err(|e| PipelineError::io(target, e))?;
        drop(file);
        tracing::debug!(url, bytes = written, "body written");

        if written == 0 {
            let _ = std::fs::remove_file(target);
            return Ok(FetchOutcome::Failed("empty response body".into()));
        }
        if is_pdf_file(target) {
            return Ok(FetchOutcome::Saved(target.to_path_buf()));
        }
        let mut html = target.as_os_str().to_owned();
        html.push(".html");
        let html = PathBuf::from(html);
        std::fs::rename(target, &html).map_err(|e| PipelineError::io(target, e))?;
        Ok(FetchOutcome::NotPdf(html))
    }
}

/// Append `refs` numbered from 1. Nothing is written for an empty list.
fn append_references(path: &Path, refs: &[String]) -> Result<(), PipelineError> {
    if refs.is_empty() {
        return Ok(());
    }
    let mut text = String::new();
    for (i, r) in refs.iter().enumerate() {
        text.push_str(&format!("{}. {r}\n", i + 1));
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipelineError::io(path, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| PipelineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(authors: &[&str], year: Option<&str>) -> PaperRecord {
        PaperRecord {
            title: "Peer Collaboration in Rural Schools".into(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year: year.map(str::to_string),
            pdf_url: "https://example.org/p.pdf".into(),
            landing_url: None,
        }
    }

    #[test]
    fn test_apa_reference() {
        assert_eq!(
            record(&["Smith, J.", "Doe, A.", "Roe, B."], Some("2021")).apa_reference("arXiv"),
            "Smith, J., Doe, A., & Roe, B. (2021). Peer Collaboration in Rural Schools. arXiv. Retrieved from https://example.org/p.pdf"
        );
        assert_eq!(
            record(&[], None).apa_reference("peDOCS"),
            "Unknown author (n.d.). Peer Collaboration in Rural Schools. peDOCS. Retrieved from https://example.org/p.pdf"
        );
    }

    #[test]
    fn test_apa_reference_prefers_landing_page() {
        let mut r = record(&["Smith, J."], Some("2021"));
        r.landing_url = Some("https://example.org/abs/1".into());
        assert!(r.apa_reference("arXiv").ends_with("Retrieved from https://example.org/abs/1"));
    }

    #[test]
    fn test_manual_source_respects_limit() {
        let source = ManualSource::new("manual", vec![record(&[], None); 5]);
        assert_eq!(source.search("q", "2024", 3).unwrap().len(), 3);
        assert_eq!(source.name(), "manual");
    }

    #[test]
    fn test_append_references_numbers_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REFERENCES_FILE);
        append_references(&path, &["A (2020). T. db. Retrieved from u".into(), "B (2021). U. db. Retrieved from v".into()])
            .unwrap();
        append_references(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "1. A (2020). T. db. Retrieved from u\n2. B (2021). U. db. Retrieved from v\n"
        );
    }

    #[test]
    fn test_paper_record_deserialize_defaults() {
        let r: PaperRecord =
            serde_json::from_str(r#"{"title":"T","pdf_url":"http://x/y.pdf"}"#).unwrap();
        assert!(r.authors.is_empty());
        assert_eq!(r.year, None);
        assert_eq!(r.landing_url, None);
    }
}

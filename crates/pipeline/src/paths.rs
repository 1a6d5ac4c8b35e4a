// crates/pipeline/src/paths.rs
//! Folder naming and directory listings shared by the stages.

use chrono::{DateTime, Local, NaiveDate};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::PipelineError;

/// File holding the question set inside an extraction output folder.
pub const QUESTIONS_FILE: &str = "questions.txt";

/// File the download stage appends APA references to.
pub const REFERENCES_FILE: &str = "source_references.txt";

/// `<data_root>/<pdf_dir_name>_<YYYY-MM-DD>`
pub fn extraction_output_dir(data_root: &Path, pdf_dir: &Path, date: NaiveDate) -> PathBuf {
    let name = pdf_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "papers".to_string());
    data_root.join(format!("{name}_{}", date.format("%Y-%m-%d")))
}

/// `analysis_result_paper<k>.txt`, `k` 1-based.
pub fn result_file_name(k: usize) -> String {
    format!("analysis_result_paper{k}.txt")
}

/// `<downloads_root>/<database>_<query>_<year>` with every run of
/// non-alphanumeric characters in the query collapsed to `_`.
pub fn download_dir(downloads_root: &Path, database: &str, query: &str, year: &str) -> PathBuf {
    downloads_root.join(format!(
        "{}_{}_{}",
        sanitize_component(database),
        sanitize_component(query),
        sanitize_component(year)
    ))
}

/// `<analysis_root>/evaluation_<YYYY-MM-DD_HH-MM-SS>`
pub fn evaluation_dir(analysis_root: &Path, now: DateTime<Local>) -> PathBuf {
    analysis_root.join(format!("evaluation_{}", now.format("%Y-%m-%d_%H-%M-%S")))
}

/// `<downloads_root>/upload_<YYYY-MM-DD_HH-MM-SS>`
pub fn upload_dir(downloads_root: &Path, now: DateTime<Local>) -> PathBuf {
    downloads_root.join(format!("upload_{}", now.format("%Y-%m-%d_%H-%M-%S")))
}

/// Safe on-disk name for a client-supplied upload name, or `None` when it
/// does not end in `.pdf`. Any directory part is dropped.
pub fn uploaded_pdf_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let (stem, ext) = base.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case("pdf") {
        return None;
    }
    let stem = sanitize_component(stem);
    if stem.is_empty() {
        return Some("document.pdf".to_string());
    }
    Some(format!("{stem}.pdf"))
}

/// Collapse runs of characters that are not alphanumeric into one `_` and
/// trim underscores at both ends.
pub fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Resolve a user-supplied directory name below `root`. Absolute paths and
/// `..` components are rejected.
pub fn resolve_under(root: &Path, name: &str) -> Option<PathBuf> {
    let rel = Path::new(name.trim());
    if name.trim().is_empty() || rel.is_absolute() {
        return None;
    }
    if rel
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir))
    {
        return None;
    }
    Some(root.join(rel))
}

/// Files directly inside `dir` whose extension matches `ext`
/// (case-insensitive), sorted by file name.
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            PipelineError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Names of the immediate sub-directories of `root`, sorted. A missing
/// root yields an empty list.
pub fn list_subdirectories(root: &Path) -> Result<Vec<String>, PipelineError> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            PipelineError::io(path, e.into())
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    dirs.sort();
    Ok(dirs)
}

// crates/core/src/results.rs
//! Persisted per-document result files.
//!
//! Format, one section per chunk, sections separated by a blank line:
//!
//! ```text
//! Result for section 1:
//! 1. Answer: Funding rose in 2020.
//!    Citation: "Funding rose in 2020"
//! 2. NO_ANSWER
//! ```
//!
//! The writer appends and flushes one section at a time, so a file is
//! readable at any point, including after an aborted run. The reader parses
//! the same markers for the evaluation stage.

use regex_lite::Regex;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::ResultsError;
use crate::locale::{Language, Locale, NO_ANSWER_MARKER};
use crate::parser::strip_quotes;
use crate::validator::Resolution;

/// Render one section: header line plus one line (or two) per question.
pub fn format_section(section: usize, resolutions: &[Resolution], locale: &Locale) -> String {
    let strings = locale.strings;
    let mut out = format!("{} {}:\n", strings.result_header, section);
    for (idx, res) in resolutions.iter().enumerate() {
        let n = idx + 1;
        match res {
            Resolution::Answered { answer, citation } => {
                out.push_str(&format!(
                    "{n}. {}: {answer}\n   {}: \"{citation}\"\n",
                    strings.answer_label, strings.citation_label
                ));
            }
            Resolution::NoAnswer(_) => out.push_str(&format!("{n}. {NO_ANSWER_MARKER}\n")),
        }
    }
    out
}

/// Append-only writer for one document's result file.
pub struct ResultWriter {
    path: PathBuf,
    file: File,
    sections_written: usize,
    locale: &'static Locale,
}

impl ResultWriter {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl Into<PathBuf>, locale: &'static Locale) -> Result<Self, ResultsError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| ResultsError::io(&path, e))?;
        Ok(Self {
            path,
            file,
            sections_written: 0,
            locale,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sections_written(&self) -> usize {
        self.sections_written
    }

    /// Append the section for 1-based `section` and flush it to disk.
    pub fn append_section(
        &mut self,
        section: usize,
        resolutions: &[Resolution],
    ) -> Result<(), ResultsError> {
        let mut text = String::new();
        if self.sections_written > 0 {
            text.push('\n');
        }
        text.push_str(&format_section(section, resolutions, self.locale));

        self.file
            .write_all(text.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| ResultsError::io(&self.path, e))?;
        self.sections_written += 1;
        Ok(())
    }
}

/// One numbered line of a persisted section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub question: usize,
    /// `None` for NO_ANSWER lines.
    pub answer: Option<String>,
    pub citation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSection {
    pub index: usize,
    pub entries: Vec<ResultEntry>,
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let headers: Vec<String> = Language::ALL
            .iter()
            .map(|l| regex_lite::escape(l.locale().strings.result_header))
            .collect();
        Regex::new(&format!(r"(?i)^\s*(?:{})\s+(\d+):\s*$", headers.join("|")))
            .expect("valid section header regex")
    })
}

fn entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\.\s*(.*)$").expect("valid entry regex"))
}

/// Parse a result file's text back into sections. Accepts headers and
/// labels of every supported language.
pub fn parse_results(text: &str) -> Vec<ResultSection> {
    let mut sections: Vec<ResultSection> = Vec::new();
    // (question, lines) of the entry being collected
    let mut pending: Option<(usize, Vec<String>)> = None;

    let flush = |sections: &mut Vec<ResultSection>, pending: &mut Option<(usize, Vec<String>)>| {
        if let (Some(section), Some((question, lines))) = (sections.last_mut(), pending.take()) {
            section.entries.push(parse_entry(question, &lines));
        }
    };

    for line in text.lines() {
        if let Some(caps) = header_re().captures(line) {
            flush(&mut sections, &mut pending);
            let index = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            sections.push(ResultSection {
                index,
                entries: Vec::new(),
            });
            continue;
        }
        if sections.is_empty() {
            continue;
        }
        if let Some(caps) = entry_re().captures(line) {
            flush(&mut sections, &mut pending);
            let question = caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            let rest = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            pending = Some((question, vec![rest]));
        } else if let Some((_, lines)) = pending.as_mut() {
            if !line.trim().is_empty() {
                lines.push(line.trim().to_string());
            }
        }
    }
    flush(&mut sections, &mut pending);
    sections
}

fn parse_entry(question: usize, lines: &[String]) -> ResultEntry {
    let first = lines.first().map(|s| s.trim()).unwrap_or_default();
    let no_answer = first.is_empty()
        || first == NO_ANSWER_MARKER
        || Language::ALL.iter().any(|l| l.locale().is_no_answer(first));
    if no_answer {
        return ResultEntry {
            question,
            answer: None,
            citation: None,
        };
    }

    let answer = Language::ALL
        .iter()
        .find_map(|l| l.locale().answer_field(first))
        .unwrap_or(first)
        .to_string();
    let citation = lines.iter().skip(1).find_map(|line| {
        Language::ALL
            .iter()
            .find_map(|l| l.locale().citation_field(line))
            .map(|c| strip_quotes(c).to_string())
    });

    ResultEntry {
        question,
        answer: Some(answer),
        citation,
    }
}

/// Read and parse a result file. Invalid UTF-8 is decoded lossily.
pub fn read_result_file(path: &Path) -> Result<Vec<ResultSection>, ResultsError> {
    let bytes = std::fs::read(path).map_err(|e| ResultsError::io(path, e))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), "result file is not valid UTF-8; decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    Ok(parse_results(&text))
}

/// Answers grouped by question number, NO_ANSWER entries dropped.
/// Questions left without answers do not appear.
pub fn answers_by_question<'a>(
    sections: impl IntoIterator<Item = &'a ResultSection>,
) -> BTreeMap<usize, Vec<String>> {
    let mut grouped: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for section in sections {
        for entry in &section.entries {
            if let Some(answer) = &entry.answer {
                grouped.entry(entry.question).or_default().push(answer.clone());
            }
        }
    }
    grouped
}

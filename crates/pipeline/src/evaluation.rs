// crates/pipeline/src/evaluation.rs
//! Evaluation stage: group persisted answers by question and summarize them.

use chrono::Local;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use facts_core::results::{parse_results, ResultSection};
use facts_core::{answers_by_question, Locale};
use facts_jobs::{percent_of, JobContext};

use crate::error::PipelineError;
use crate::paths::{self, QUESTIONS_FILE};

/// Weighted terms describing one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSummary {
    pub topic_index: usize,
    pub terms: Vec<(String, f64)>,
}

/// Turns a question's answers into topics.
pub trait TopicModeler: Send + Sync {
    fn topics(&self, answers: &[String], locale: &Locale) -> Vec<TopicSummary>;
}

/// Single topic made of the most frequent non-stopword terms, weighted by
/// their share of all counted terms.
#[derive(Debug, Clone)]
pub struct TermFrequencyModeler {
    pub top_terms: usize,
    pub min_term_len: usize,
}

impl Default for TermFrequencyModeler {
    fn default() -> Self {
        Self {
            top_terms: 10,
            min_term_len: 3,
        }
    }
}

impl TopicModeler for TermFrequencyModeler {
    fn topics(&self, answers: &[String], locale: &Locale) -> Vec<TopicSummary> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total = 0usize;
        for answer in answers {
            for word in answer
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| w.chars().count() >= self.min_term_len)
                .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
                .filter(|w| !locale.is_stopword(w))
            {
                *counts.entry(word.to_string()).or_default() += 1;
                total += 1;
            }
        }
        if total == 0 {
            return Vec::new();
        }
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let terms = ranked
            .into_iter()
            .take(self.top_terms)
            .map(|(term, n)| (term, n as f64 / total as f64))
            .collect();
        vec![TopicSummary {
            topic_index: 1,
            terms,
        }]
    }
}

/// Read every result file in `dir` (all `*.txt` except `questions.txt`).
/// Empty files are skipped.
pub fn load_result_sections(dir: &Path) -> Result<Vec<ResultSection>, PipelineError> {
    let mut sections = Vec::new();
    let mut texts = 0usize;
    for path in paths::files_with_extension(dir, "txt")? {
        if path.file_name().is_some_and(|n| n == QUESTIONS_FILE) {
            continue;
        }
        let bytes = std::fs::read(&path).map_err(|e| PipelineError::io(&path, e))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), "not valid UTF-8; decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        texts += 1;
        sections.extend(parse_results(&text));
    }
    if texts == 0 {
        return Err(PipelineError::NoTexts);
    }
    Ok(sections)
}

/// Questions stored next to the result files, one per line. Missing file
/// yields an empty list.
pub fn load_questions(dir: &Path) -> Result<Vec<String>, PipelineError> {
    let path = dir.join(QUESTIONS_FILE);
    if !path.exists() {
        tracing::warn!(dir = %dir.display(), "no questions.txt found");
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Single-column CSV with RFC 4180 quoting.
pub fn render_csv(header: &str, rows: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&csv_field(header));
    out.push_str("\r\n");
    for row in rows {
        out.push_str(&csv_field(row));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_topics(question: &str, topics: &[TopicSummary]) -> String {
    let mut out = format!("{question}\n\n");
    if topics.is_empty() {
        out.push_str("No terms found.\n");
    }
    for topic in topics {
        out.push_str(&format!("Topic {}:\n", topic.topic_index));
        for (term, weight) in &topic.terms {
            out.push_str(&format!("  {term}: {weight:.3}\n"));
        }
    }
    out
}

pub struct EvaluationWorker {
    modeler: Box<dyn TopicModeler>,
    locale: &'static Locale,
}

impl EvaluationWorker {
    pub fn new(modeler: Box<dyn TopicModeler>, locale: &'static Locale) -> Self {
        Self { modeler, locale }
    }

    /// Evaluate the result files in `data_dir`, writing one sub-folder per
    /// answered question below a fresh `evaluation_<timestamp>` folder in
    /// `analysis_root`. Returns that folder.
    pub fn run(
        &self,
        ctx: &JobContext,
        data_dir: &Path,
        analysis_root: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let sections = load_result_sections(data_dir)?;
        let grouped: BTreeMap<usize, Vec<String>> = answers_by_question(&sections)
            .into_iter()
            .map(|(q, answers)| {
                let kept: Vec<String> = answers
                    .into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty() && !self.locale.is_no_answer(a))
                    .collect();
                (q, kept)
            })
            .filter(|(_, answers)| !answers.is_empty())
            .collect();
        if grouped.is_empty() {
            return Err(PipelineError::NoValidAnswers);
        }

        let questions = load_questions(data_dir)?;
        let out_dir = paths::evaluation_dir(analysis_root, Local::now());
        std::fs::create_dir_all(&out_dir).map_err(|e| PipelineError::io(&out_dir, e))?;
        tracing::info!(
            job_id = %ctx.id(),
            data_dir = %data_dir.display(),
            out_dir = %out_dir.display(),
            questions = grouped.len(),
            "evaluation started"
        );
        ctx.set_percent(10);

        let total = grouped.len();
        let mut written = 0usize;
        for (done, (q, answers)) in grouped.iter().enumerate() {
            ctx.checkpoint()?;
            let Some(question) = q.checked_sub(1).and_then(|i| questions.get(i)) else {
                tracing::warn!(question = q, "answers for a question not in questions.txt, skipping");
                continue;
            };
            self.write_question(&out_dir, *q, question, answers)?;
            written += 1;
            ctx.set_percent(10 + percent_of(done + 1, total, 80));
        }

        ctx.set_folder(out_dir.display().to_string());
        ctx.set_result(format!("{written} questions evaluated"));
        Ok(out_dir)
    }

    fn write_question(
        &self,
        out_dir: &Path,
        q: usize,
        question: &str,
        answers: &[String],
    ) -> Result<(), PipelineError> {
        let dir = out_dir.join(format!("question_{q}"));
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;

        let write = |name: String, contents: String| {
            let path = dir.join(name);
            std::fs::write(&path, contents).map_err(|e| PipelineError::io(&path, e))
        };
        write(format!("question_{q}.txt"), question.to_string())?;
        write(
            format!("question_{q}_responses.csv"),
            render_csv(&format!("Question {q} Answers"), answers),
        )?;
        let topics = self.modeler.topics(answers, self.locale);
        write(format!("question_{q}_topics.txt"), render_topics(question, &topics))?;
        tracing::debug!(question = q, answers = answers.len(), topics = topics.len(), "question evaluated");
        Ok(())
    }
}

// crates/core/src/prompt.rs
//! Prompt assembly: a fixed protocol header plus one chunk.

use crate::locale::Locale;
use crate::questions::QuestionSet;

/// Builds one prompt per chunk from a header computed once per job.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    header: String,
    section_label: &'static str,
}

impl PromptBuilder {
    pub fn new(locale: &Locale, questions: &QuestionSet) -> Self {
        let strings = locale.strings;
        let mut query = String::new();

        if questions.expected_count() == 1 {
            query.push_str(strings.single_question_intro);
            query.push('\n');
            query.push_str(&format!("{} 1: {}", strings.question_label, questions.questions()[0]));
        } else {
            query.push_str(strings.multi_question_intro);
            query.push('\n');
            for (idx, q) in questions.questions().iter().enumerate() {
                query.push_str(&format!("{} {}: {}\n", strings.question_label, idx + 1, q));
            }
        }

        Self {
            header: format!("{}\n\n{}", strings.system_message, query),
            section_label: strings.section_label,
        }
    }

    /// The part shared by every chunk of the job.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Prompt for the chunk at 1-based `section`.
    pub fn build(&self, section: usize, chunk: &str) -> String {
        format!("{}\n\n{} {}:\n{}", self.header, self.section_label, section, chunk)
    }
}

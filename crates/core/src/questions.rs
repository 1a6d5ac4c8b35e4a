// crates/core/src/questions.rs
//! The ordered question set of one extraction run and its keyword sets.

use std::collections::BTreeSet;

use crate::locale::Locale;

/// Shortest word that counts as a keyword.
pub const MIN_KEYWORD_LEN: usize = 4;

/// Ordered questions, fixed for the lifetime of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<String>,
    keywords: Vec<BTreeSet<String>>,
}

impl QuestionSet {
    /// Build from newline-separated text: lines are trimmed, blank lines
    /// dropped. Returns `None` when nothing is left.
    pub fn parse(text: &str, locale: &Locale) -> Option<Self> {
        let questions: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect();
        Self::new(questions, locale)
    }

    pub fn new(questions: Vec<String>, locale: &Locale) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        let keywords = questions.iter().map(|q| extract_keywords(q, locale)).collect();
        Some(Self { questions, keywords })
    }

    /// Number of answer lines expected per chunk.
    pub fn expected_count(&self) -> usize {
        self.questions.len()
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Keyword set of the question at 1-based `index`.
    pub fn keywords(&self, index: usize) -> Option<&BTreeSet<String>> {
        index.checked_sub(1).and_then(|i| self.keywords.get(i))
    }

    /// Questions as written to `questions.txt`.
    pub fn to_file_contents(&self) -> String {
        let mut out = self.questions.join("\n");
        out.push('\n');
        out
    }
}

/// Lower-cased content words of at least [`MIN_KEYWORD_LEN`] characters,
/// stopwords removed.
pub fn extract_keywords(question: &str, locale: &Locale) -> BTreeSet<String> {
    question
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|w| !locale.is_stopword(w))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Language;

    #[test]
    fn test_parse_trims_and_drops_blank_lines() {
        let set = QuestionSet::parse("  What changed?\n\n\nWho funded it?  \n", Language::English.locale())
            .unwrap();
        assert_eq!(set.expected_count(), 2);
        assert_eq!(set.questions(), ["What changed?", "Who funded it?"]);
        assert_eq!(set.to_file_contents(), "What changed?\nWho funded it?\n");
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(QuestionSet::parse(" \n \n", Language::English.locale()).is_none());
    }

    #[test]
    fn test_extract_keywords_filters_short_and_stopwords() {
        let kws = extract_keywords(
            "Which effects does climate change have on crops?",
            Language::English.locale(),
        );
        let expected: BTreeSet<String> = ["effects", "climate", "change", "have", "crops"]
            .into_iter()
            .map(String::from)
            .filter(|w| !Language::English.locale().is_stopword(w))
            .collect();
        assert_eq!(kws, expected);
        assert!(!kws.contains("which"));
        assert!(!kws.contains("on"));
    }

    #[test]
    fn test_extract_keywords_unicode() {
        let kws = extract_keywords("Welche Förderung gab es für Schulen?", Language::German.locale());
        assert!(kws.contains("förderung"));
        assert!(kws.contains("schulen"));
        assert!(!kws.contains("welche"));
        assert!(!kws.contains("für"));
    }

    #[test]
    fn test_keywords_are_one_based() {
        let set = QuestionSet::parse("Climate impact?", Language::English.locale()).unwrap();
        assert!(set.keywords(0).is_none());
        assert!(set.keywords(1).unwrap().contains("climate"));
        assert!(set.keywords(2).is_none());
    }

    #[test]
    fn test_question_of_short_words_has_no_keywords() {
        let set = QuestionSet::parse("Is it so?", Language::English.locale()).unwrap();
        assert!(set.keywords(1).unwrap().is_empty());
    }
}

// crates/core/src/parser.rs
//! Parsing of raw generator output into one block per question.
//!
//! Two stages. [`segment`] cuts the output into exactly `expected_count`
//! pieces; [`parse_segment`] pulls the answer and citation out of each.
//! Neither stage ever fails: malformed output becomes NO_ANSWER blocks.

use regex_lite::Regex;
use std::sync::OnceLock;

use crate::locale::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Answered,
    NoAnswer,
}

/// One question's share of a chunk's output, before grounding checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerBlock {
    /// 1-based.
    pub question_index: usize,
    pub status: BlockStatus,
    pub answer: Option<String>,
    pub citation: Option<String>,
}

impl AnswerBlock {
    pub fn no_answer(question_index: usize) -> Self {
        Self {
            question_index,
            status: BlockStatus::NoAnswer,
            answer: None,
            citation: None,
        }
    }
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{1,3}\.(?:\s+|$)").expect("valid marker regex"))
}

/// Parse raw output into exactly `expected_count` blocks, in question order.
pub fn parse_response(raw: &str, expected_count: usize, locale: &Locale) -> Vec<AnswerBlock> {
    segment(raw, expected_count, locale)
        .iter()
        .enumerate()
        .map(|(idx, seg)| parse_segment(seg, idx + 1, locale))
        .collect()
}

/// Structural segmentation.
///
/// With numbered markers (`1.` at line start) each marker opens a segment;
/// text before the first marker is dropped and empty segments keep their
/// slot. Without markers, blank-line separated paragraphs are used. The
/// result is padded with empty segments or truncated to `expected_count`.
pub fn segment(raw: &str, expected_count: usize, locale: &Locale) -> Vec<String> {
    let body = locale.strip_preamble(raw);
    let re = marker_re();

    let mut segments: Vec<String> = if body.lines().any(|l| re.is_match(l)) {
        let mut out: Vec<String> = Vec::new();
        for line in body.lines() {
            if let Some(m) = re.find(line) {
                out.push(line[m.end()..].to_string());
            } else if let Some(current) = out.last_mut() {
                current.push('\n');
                current.push_str(line);
            }
        }
        out.into_iter().map(|s| s.trim().to_string()).collect()
    } else {
        let mut out = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in body.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    out.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(line.trim_end());
            }
        }
        if !current.is_empty() {
            out.push(current.join("\n"));
        }
        out
    };

    segments.resize(expected_count, String::new());
    segments
}

/// Field extraction for one segment.
pub fn parse_segment(segment: &str, question_index: usize, locale: &Locale) -> AnswerBlock {
    let lines: Vec<&str> = segment
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut answer = lines.iter().find_map(|l| locale.answer_field(l)).map(str::to_owned);
    let mut citation = lines.iter().find_map(|l| locale.citation_field(l)).map(str::to_owned);

    if answer.as_deref().map_or(true, str::is_empty) {
        answer = lines.first().map(|l| l.to_string());
        if citation.is_none() {
            citation = lines.get(1).map(|l| l.to_string());
        }
    }

    let Some(answer) = answer.filter(|a| !a.is_empty()) else {
        return AnswerBlock::no_answer(question_index);
    };
    if locale.is_no_answer(&answer) {
        return AnswerBlock::no_answer(question_index);
    }

    AnswerBlock {
        question_index,
        status: BlockStatus::Answered,
        answer: Some(answer),
        citation: citation
            .map(|c| strip_quotes(&c).to_string())
            .filter(|c| !c.is_empty()),
    }
}

/// Strip one layer of surrounding quotation marks.
pub fn strip_quotes(text: &str) -> &str {
    text.trim()
        .trim_start_matches(['"', '\u{201C}', '\u{201E}', '\u{00BB}'])
        .trim_end_matches(['"', '\u{201D}', '\u{201C}', '\u{00AB}'])
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Language;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn en() -> &'static Locale {
        Language::English.locale()
    }

    #[test]
    fn test_numbered_output() {
        let raw = "1. Answer: Funding rose in 2020.\n   Citation: \"Funding rose in 2020\"\n2. NO_ANSWER";
        let blocks = parse_response(raw, 2, en());
        assert_eq!(
            blocks,
            vec![
                AnswerBlock {
                    question_index: 1,
                    status: BlockStatus::Answered,
                    answer: Some("Funding rose in 2020.".into()),
                    citation: Some("Funding rose in 2020".into()),
                },
                AnswerBlock::no_answer(2),
            ]
        );
    }

    #[test]
    fn test_preamble_is_dropped() {
        let raw = "Here are the answers:\n1. Answer: Yes.\n   Citation: \"it is so\"";
        let blocks = parse_response(raw, 1, en());
        assert_eq!(blocks[0].answer.as_deref(), Some("Yes."));
    }

    #[test]
    fn test_marker_on_its_own_line() {
        let raw = "1.\nAnswer: Yes.\nCitation: quoted words\n2.\nNO ANSWER!";
        let segs = segment(raw, 2, en());
        assert_eq!(segs, vec!["Answer: Yes.\nCitation: quoted words", "NO ANSWER!"]);
    }

    #[test]
    fn test_empty_segments_keep_position() {
        let raw = "1.\n2. Answer: Second.\nCitation: \"second quote\"";
        let blocks = parse_response(raw, 2, en());
        assert_eq!(blocks[0].status, BlockStatus::NoAnswer);
        assert_eq!(blocks[1].answer.as_deref(), Some("Second."));
    }

    #[test]
    fn test_paragraph_fallback() {
        let raw = "The budget grew.\n\"the budget grew by a third\"\n\n\nNO ANSWER!";
        let blocks = parse_response(raw, 2, en());
        assert_eq!(blocks[0].answer.as_deref(), Some("The budget grew."));
        assert_eq!(blocks[0].citation.as_deref(), Some("the budget grew by a third"));
        assert_eq!(blocks[1].status, BlockStatus::NoAnswer);
    }

    #[test]
    fn test_pads_and_truncates() {
        assert_eq!(parse_response("1. Answer: a\n2. Answer: b\n3. Answer: c", 2, en()).len(), 2);
        let blocks = parse_response("1. Answer: a", 3, en());
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2], AnswerBlock::no_answer(3));
    }

    #[test]
    fn test_sentinel_variants_are_no_answer() {
        for sentinel in ["NO ANSWER!", "no answer", "No_Answer.", "Answer: NO ANSWER!"] {
            let blocks = parse_response(&format!("1. {sentinel}"), 1, en());
            assert_eq!(blocks[0].status, BlockStatus::NoAnswer, "{sentinel}");
        }
    }

    #[test]
    fn test_unlabelled_lines_fall_back_to_position() {
        let blocks = parse_response("1. It was funded publicly.\n\"funded by the state\"", 1, en());
        assert_eq!(blocks[0].answer.as_deref(), Some("It was funded publicly."));
        assert_eq!(blocks[0].citation.as_deref(), Some("funded by the state"));
    }

    #[test]
    fn test_missing_citation_is_none() {
        let blocks = parse_response("1. Answer: Yes.", 1, en());
        assert_eq!(blocks[0].status, BlockStatus::Answered);
        assert_eq!(blocks[0].citation, None);
    }

    #[test]
    fn test_timeout_output_is_one_unlabelled_block() {
        let blocks = parse_response(crate::llm::TIMEOUT_OUTPUT, 2, en());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].citation, None);
        assert_eq!(blocks[1].status, BlockStatus::NoAnswer);
    }

    #[test]
    fn test_german_labels() {
        let raw = "Hier sind die Antworten:\n1. Antwort: Ja.\n   Beleg: „Die Förderung stieg“\n2. KEINE ANTWORT!";
        let blocks = parse_response(raw, 2, Language::German.locale());
        assert_eq!(blocks[0].answer.as_deref(), Some("Ja."));
        assert_eq!(blocks[0].citation.as_deref(), Some("Die Förderung stieg"));
        assert_eq!(blocks[1].status, BlockStatus::NoAnswer);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"quoted\""), "quoted");
        assert_eq!(strip_quotes("\u{201C}curly\u{201D}"), "curly");
        assert_eq!(strip_quotes("bare"), "bare");
    }

    proptest! {
        #[test]
        fn prop_block_count_matches_expected(raw in "\\PC{0,400}", expected in 1usize..12) {
            let blocks = parse_response(&raw, expected, en());
            prop_assert_eq!(blocks.len(), expected);
            for (i, b) in blocks.iter().enumerate() {
                prop_assert_eq!(b.question_index, i + 1);
            }
        }

        #[test]
        fn prop_block_count_with_numbered_noise(
            lines in prop::collection::vec("([0-9]{1,3}\\. )?[a-zA-Z :\"]{0,30}", 0..30),
            expected in 1usize..8,
        ) {
            let raw = lines.join("\n");
            prop_assert_eq!(parse_response(&raw, expected, en()).len(), expected);
        }
    }
}

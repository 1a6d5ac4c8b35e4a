// crates/core/src/validator.rs
//! Grounding checks applied to every parsed block.
//!
//! An answer survives only if its citation literally occurs in the chunk it
//! was generated from. The checks run in a fixed order and the first one that
//! fails decides the outcome.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::locale::Locale;
use crate::parser::{AnswerBlock, BlockStatus};

/// Citations shorter than this (in characters) are rejected.
pub const MIN_CITATION_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The model answered with the sentinel, or said nothing.
    Sentinel,
    /// None of the question's keywords occur in the chunk.
    ChunkOffTopic,
    MissingCitation,
    /// The citation describes the text instead of quoting it.
    MetaRefusal,
    CitationTooShort,
    CitationNotInChunk,
    /// The citation is verbatim but shares no keyword with the question.
    CitationOffTopic,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentinel => "sentinel",
            Self::ChunkOffTopic => "chunk_off_topic",
            Self::MissingCitation => "missing_citation",
            Self::MetaRefusal => "meta_refusal",
            Self::CitationTooShort => "citation_too_short",
            Self::CitationNotInChunk => "citation_not_in_chunk",
            Self::CitationOffTopic => "citation_off_topic",
        }
    }
}

/// Final per-question outcome for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answered { answer: String, citation: String },
    NoAnswer(RejectReason),
}

impl Resolution {
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

/// Validate one block against its chunk.
///
/// `chunk_lower` must already be lower-cased; callers validate many blocks
/// against the same chunk.
pub fn validate_block(
    block: &AnswerBlock,
    chunk_lower: &str,
    keywords: Option<&BTreeSet<String>>,
    locale: &Locale,
) -> Resolution {
    if block.status == BlockStatus::NoAnswer {
        return Resolution::NoAnswer(RejectReason::Sentinel);
    }
    let Some(answer) = block.answer.as_deref() else {
        return Resolution::NoAnswer(RejectReason::Sentinel);
    };

    let keywords = keywords.filter(|k| !k.is_empty());
    if let Some(kws) = keywords {
        if !kws.iter().any(|k| chunk_lower.contains(k.as_str())) {
            return Resolution::NoAnswer(RejectReason::ChunkOffTopic);
        }
    }

    let Some(citation) = block.citation.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
        return Resolution::NoAnswer(RejectReason::MissingCitation);
    };
    let citation_lower = citation.to_lowercase();

    if locale.is_meta_refusal(&citation_lower) {
        return Resolution::NoAnswer(RejectReason::MetaRefusal);
    }
    if citation.chars().count() < MIN_CITATION_CHARS {
        return Resolution::NoAnswer(RejectReason::CitationTooShort);
    }
    if !chunk_lower.contains(citation_lower.as_str()) {
        return Resolution::NoAnswer(RejectReason::CitationNotInChunk);
    }
    if let Some(kws) = keywords {
        if !kws.iter().any(|k| citation_lower.contains(k.as_str())) {
            return Resolution::NoAnswer(RejectReason::CitationOffTopic);
        }
    }

    Resolution::Answered {
        answer: answer.to_string(),
        citation: citation.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Language;
    use crate::parser::parse_response;
    use crate::questions::QuestionSet;
    use proptest::prelude::*;

    const CHUNK: &str = "Funding rose in 2020. No data on staffing was found.";

    fn en() -> &'static Locale {
        Language::English.locale()
    }

    fn answered(answer: &str, citation: Option<&str>) -> AnswerBlock {
        AnswerBlock {
            question_index: 1,
            status: BlockStatus::Answered,
            answer: Some(answer.into()),
            citation: citation.map(String::from),
        }
    }

    fn kws(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_grounded_answer_is_accepted() {
        let chunk = CHUNK.to_lowercase();
        let res = validate_block(
            &answered("Funding rose in 2020.", Some("Funding rose in 2020")),
            &chunk,
            None,
            en(),
        );
        assert_eq!(
            res,
            Resolution::Answered {
                answer: "Funding rose in 2020.".into(),
                citation: "Funding rose in 2020".into()
            }
        );
    }

    #[test]
    fn test_paraphrased_citation_is_rejected() {
        let chunk = CHUNK.to_lowercase();
        let res = validate_block(
            &answered("Funding rose.", Some("Funding increased")),
            &chunk,
            None,
            en(),
        );
        assert_eq!(res, Resolution::NoAnswer(RejectReason::CitationNotInChunk));
    }

    #[test]
    fn test_funding_scenario_end_to_end() {
        let questions =
            QuestionSet::parse("How did funding change?\nHow many staff were hired?", en()).unwrap();
        let raw = "1. Answer: Funding rose in 2020.\n   Citation: \"Funding rose in 2020\"\n2. NO_ANSWER";
        let chunk = CHUNK.to_lowercase();
        let resolutions: Vec<Resolution> = parse_response(raw, 2, en())
            .iter()
            .map(|b| validate_block(b, &chunk, questions.keywords(b.question_index), en()))
            .collect();
        assert!(resolutions[0].is_answered());
        assert_eq!(resolutions[1], Resolution::NoAnswer(RejectReason::Sentinel));
    }

    #[test]
    fn test_keyword_gate_on_chunk() {
        let chunk = CHUNK.to_lowercase();
        let res = validate_block(
            &answered("Funding rose in 2020.", Some("Funding rose in 2020")),
            &chunk,
            Some(&kws(&["climate"])),
            en(),
        );
        assert_eq!(res, Resolution::NoAnswer(RejectReason::ChunkOffTopic));
    }

    #[test]
    fn test_keyword_gate_on_citation() {
        let chunk = CHUNK.to_lowercase();
        let res = validate_block(
            &answered("Nothing on staff.", Some("No data on staffing was found")),
            &chunk,
            Some(&kws(&["funding"])),
            en(),
        );
        assert_eq!(res, Resolution::NoAnswer(RejectReason::CitationOffTopic));
    }

    #[test]
    fn test_empty_keyword_set_skips_gates() {
        let chunk = CHUNK.to_lowercase();
        let res = validate_block(
            &answered("Funding rose.", Some("Funding rose in 2020")),
            &chunk,
            Some(&BTreeSet::new()),
            en(),
        );
        assert!(res.is_answered());
    }

    #[test]
    fn test_missing_citation() {
        let res = validate_block(&answered("Yes.", None), &CHUNK.to_lowercase(), None, en());
        assert_eq!(res, Resolution::NoAnswer(RejectReason::MissingCitation));
    }

    #[test]
    fn test_meta_refusal_citation() {
        let chunk = "the term is not mentioned in this excerpt at all.";
        let res = validate_block(
            &answered("Unknown.", Some("the term is not mentioned")),
            chunk,
            None,
            en(),
        );
        assert_eq!(res, Resolution::NoAnswer(RejectReason::MetaRefusal));
    }

    #[test]
    fn test_short_citation() {
        let res = validate_block(
            &answered("Funding rose.", Some("Funding")),
            &CHUNK.to_lowercase(),
            None,
            en(),
        );
        assert_eq!(res, Resolution::NoAnswer(RejectReason::CitationTooShort));
    }

    #[test]
    fn test_case_insensitive_grounding() {
        let res = validate_block(
            &answered("Funding rose.", Some("FUNDING ROSE IN 2020")),
            &CHUNK.to_lowercase(),
            None,
            en(),
        );
        assert!(res.is_answered());
    }

    #[test]
    fn test_no_answer_block_stays_no_answer() {
        let res = validate_block(&AnswerBlock::no_answer(2), &CHUNK.to_lowercase(), None, en());
        assert_eq!(res, Resolution::NoAnswer(RejectReason::Sentinel));
    }

    proptest! {
        #[test]
        fn prop_accepted_citations_occur_in_chunk(
            chunk in "[a-zA-Z ]{0,80}",
            citation in "[a-zA-Z ]{0,30}",
        ) {
            let chunk_lower = chunk.to_lowercase();
            let block = answered("Some answer.", Some(&citation));
            if let Resolution::Answered { citation, .. } = validate_block(&block, &chunk_lower, None, en()) {
                prop_assert!(chunk_lower.contains(&citation.to_lowercase()));
            }
        }

        #[test]
        fn prop_keyword_absent_from_chunk_is_rejected(
            chunk in "[a-bd-z ]{0,80}",
            citation in "[a-z ]{10,30}",
        ) {
            // "climate" cannot occur in a chunk without the letter c
            let block = answered("Some answer.", Some(&citation));
            let res = validate_block(&block, &chunk, Some(&kws(&["climate"])), en());
            prop_assert_eq!(res, Resolution::NoAnswer(RejectReason::ChunkOffTopic));
        }
    }
}

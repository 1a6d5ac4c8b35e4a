// crates/core/src/analyzer.rs
//! One chunk through the whole protocol: prompt, generate, parse, validate.

use std::sync::Arc;
use std::time::Duration;

use crate::llm::{GenerationClient, GenerationError};
use crate::locale::Locale;
use crate::parser::parse_response;
use crate::prompt::PromptBuilder;
use crate::questions::QuestionSet;
use crate::validator::{validate_block, Resolution};

/// Per-job analyzer. Holds everything that is fixed across chunks.
pub struct ChunkAnalyzer {
    locale: &'static Locale,
    questions: QuestionSet,
    prompts: PromptBuilder,
    client: Arc<dyn GenerationClient>,
    timeout: Duration,
}

impl ChunkAnalyzer {
    pub fn new(
        locale: &'static Locale,
        questions: QuestionSet,
        client: Arc<dyn GenerationClient>,
        timeout: Duration,
    ) -> Self {
        let prompts = PromptBuilder::new(locale, &questions);
        Self {
            locale,
            questions,
            prompts,
            client,
            timeout,
        }
    }

    pub fn locale(&self) -> &'static Locale {
        self.locale
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn expected_count(&self) -> usize {
        self.questions.expected_count()
    }

    /// Resolutions for an empty chunk: NO_ANSWER for every question,
    /// without calling the generator.
    pub fn empty_chunk(&self) -> Vec<Resolution> {
        vec![
            Resolution::NoAnswer(crate::validator::RejectReason::Sentinel);
            self.expected_count()
        ]
    }

    /// Run the chunk at 1-based `section` through the generator and the
    /// grounding checks. Always returns `expected_count` resolutions unless
    /// the generator cannot be started at all.
    pub fn analyze(&self, section: usize, chunk: &str) -> Result<Vec<Resolution>, GenerationError> {
        if chunk.trim().is_empty() {
            return Ok(self.empty_chunk());
        }

        let prompt = self.prompts.build(section, chunk);
        let raw = self.client.generate(&prompt, self.timeout)?;

        let chunk_lower = chunk.to_lowercase();
        let resolutions: Vec<Resolution> = parse_response(&raw, self.expected_count(), self.locale)
            .iter()
            .map(|block| {
                let res = validate_block(
                    block,
                    &chunk_lower,
                    self.questions.keywords(block.question_index),
                    self.locale,
                );
                if let Resolution::NoAnswer(reason) = &res {
                    tracing::debug!(
                        section,
                        question = block.question_index,
                        reason = reason.as_str(),
                        "block rejected"
                    );
                }
                res
            })
            .collect();

        let accepted = resolutions.iter().filter(|r| r.is_answered()).count();
        tracing::debug!(section, accepted, total = resolutions.len(), "chunk validated");
        Ok(resolutions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Language;
    use crate::validator::RejectReason;
    use std::sync::Mutex;

    /// Replays canned outputs and records prompts.
    struct Scripted {
        outputs: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outputs: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl GenerationClient for Scripted {
        fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.outputs.lock().unwrap().pop().unwrap_or_default())
        }
        fn health_check(&self) -> Result<(), GenerationError> {
            Ok(())
        }
        fn name(&self) -> &str {
            "scripted"
        }
        fn model(&self) -> &str {
            "test"
        }
    }

    fn analyzer(questions: &str, client: Arc<dyn GenerationClient>) -> ChunkAnalyzer {
        let locale = Language::English.locale();
        ChunkAnalyzer::new(
            locale,
            QuestionSet::parse(questions, locale).unwrap(),
            client,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_grounded_and_ungrounded_answers() {
        let client = Scripted::new(&[
            "1. Answer: Funding rose in 2020.\n   Citation: \"Funding rose in 2020\"\n2. NO_ANSWER",
        ]);
        let a = analyzer("How did funding develop?\nHow many staff?", client.clone());
        let res = a
            .analyze(1, "Funding rose in 2020. No data on staffing was found.")
            .unwrap();
        assert_eq!(res.len(), 2);
        assert!(res[0].is_answered());
        assert_eq!(res[1], Resolution::NoAnswer(RejectReason::Sentinel));

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].ends_with("Section 1:\nFunding rose in 2020. No data on staffing was found."));
    }

    #[test]
    fn test_empty_chunk_skips_generator() {
        let client = Scripted::new(&[]);
        let a = analyzer("One?\nTwo?\nThree?", client.clone());
        let res = a.analyze(4, "   ").unwrap();
        assert_eq!(res.len(), 3);
        assert!(res.iter().all(|r| !r.is_answered()));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_output_is_all_no_answer() {
        let a = analyzer("One?\nTwo?", Scripted::new(&[""]));
        let res = a.analyze(1, "Some text here.").unwrap();
        assert_eq!(res, vec![Resolution::NoAnswer(RejectReason::Sentinel); 2]);
    }

    #[test]
    fn test_timeout_output_is_all_no_answer() {
        let a = analyzer("One?\nTwo?", Scripted::new(&[crate::llm::TIMEOUT_OUTPUT]));
        let res = a.analyze(1, "Some text here.").unwrap();
        assert!(res.iter().all(|r| !r.is_answered()));
    }

    #[test]
    fn test_keyword_gate_rejects_off_topic_chunk() {
        let client = Scripted::new(&["1. Answer: It rose.\n   Citation: \"Funding rose in 2020\""]);
        let a = analyzer("What about climate?", client);
        let res = a.analyze(1, "Funding rose in 2020.").unwrap();
        assert_eq!(res, vec![Resolution::NoAnswer(RejectReason::ChunkOffTopic)]);
    }

    #[test]
    fn test_spawn_failure_propagates() {
        struct Broken;
        impl GenerationClient for Broken {
            fn generate(&self, _: &str, _: Duration) -> Result<String, GenerationError> {
                Err(GenerationError::SpawnFailed("no such file".into()))
            }
            fn health_check(&self) -> Result<(), GenerationError> {
                Err(GenerationError::NotAvailable("broken".into()))
            }
            fn name(&self) -> &str {
                "broken"
            }
            fn model(&self) -> &str {
                "none"
            }
        }
        let a = analyzer("One?", Arc::new(Broken));
        assert!(matches!(a.analyze(1, "Text."), Err(GenerationError::SpawnFailed(_))));
    }
}

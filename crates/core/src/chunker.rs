// crates/core/src/chunker.rs
//! Sentence-aligned chunking of cleaned document text.

/// Default upper bound on chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Split text into sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace. The terminal
/// punctuation stays with its sentence; the whitespace run is dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_idx, next)) = iter.peek() else {
            continue;
        };
        if !next.is_whitespace() {
            continue;
        }
        let sentence = text[start..idx + c.len_utf8()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = next_idx;
        while let Some(&(_, ws)) = iter.peek() {
            if !ws.is_whitespace() {
                break;
            }
            iter.next();
            start += ws.len_utf8();
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Greedily pack whole sentences into chunks of at most `max_chars`
/// characters (Unicode scalar values).
///
/// Sentences are never split. A single sentence longer than the limit
/// becomes its own oversized chunk. Empty input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();
        if current_len > 0 && current_len + 1 + len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_sentences_basic() {
        assert_eq!(
            split_sentences("One. Two! Three? Four"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
    }

    #[test]
    fn test_split_sentences_ignores_inner_periods() {
        assert_eq!(
            split_sentences("Version 3.5 shipped. e.g.this stays."),
            vec!["Version 3.5 shipped.", "e.g.this stays."]
        );
    }

    #[test]
    fn test_split_sentences_collapses_whitespace_runs() {
        assert_eq!(split_sentences("A.   B.\n\nC."), vec!["A.", "B.", "C."]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 4000).is_empty());
        assert!(chunk_text("   ", 4000).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Funding rose in 2020. No data on staffing was found.", 4000);
        assert_eq!(chunks, vec!["Funding rose in 2020. No data on staffing was found."]);
    }

    #[test]
    fn test_packs_greedily() {
        let chunks = chunk_text("Aaaa. Bbbb. Cccc. Dddd.", 11);
        assert_eq!(chunks, vec!["Aaaa. Bbbb.", "Cccc. Dddd."]);
    }

    #[test]
    fn test_oversized_sentence_is_its_own_chunk() {
        let long = "x".repeat(50) + ".";
        let text = format!("Short. {long} Tail.");
        let chunks = chunk_text(&text, 20);
        assert_eq!(chunks, vec!["Short.".to_string(), long, "Tail.".to_string()]);
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let chunks = chunk_text("äöüäö. ßßßßß.", 13);
        assert_eq!(chunks.len(), 1);
    }

    fn sentence_strategy() -> impl Strategy<Value = String> {
        ("[a-zA-Zäö0-9,]{1,12}( [a-zA-Zäö0-9,]{1,12}){0,8}", prop::sample::select(vec!['.', '!', '?']))
            .prop_map(|(body, end)| format!("{body}{end}"))
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_sentences(
            sentences in prop::collection::vec(sentence_strategy(), 0..40),
            max in 10usize..300,
        ) {
            let text = sentences.join(" ");
            let chunks = chunk_text(&text, max);
            prop_assert_eq!(chunks.join(" "), split_sentences(&text).join(" "));
        }

        #[test]
        fn prop_chunks_respect_size_bound(
            sentences in prop::collection::vec(sentence_strategy(), 0..40),
            max in 10usize..300,
        ) {
            let text = sentences.join(" ");
            for chunk in chunk_text(&text, max) {
                let oversized_single = split_sentences(&chunk).len() == 1;
                prop_assert!(chunk.chars().count() <= max || oversized_single);
            }
        }

        #[test]
        fn prop_boundaries_fall_between_sentences(
            sentences in prop::collection::vec(sentence_strategy(), 1..30),
            max in 10usize..200,
        ) {
            let text = sentences.join(" ");
            let expected = split_sentences(&text);
            let chunks = chunk_text(&text, max);
            let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| split_sentences(c)).collect();
            prop_assert_eq!(rebuilt, expected);
        }
    }
}

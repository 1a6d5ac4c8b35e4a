// crates/core/src/text.rs
//! Normalization of raw PDF text before sentence splitting.

use regex_lite::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Knobs for [`clean_text`]. Both default to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    pub remove_list_numbers: bool,
    pub remove_page_headers: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            remove_list_numbers: true,
            remove_page_headers: true,
        }
    }
}

/// Normalize extracted text into a single line of space-separated words.
pub fn clean_text(raw: &str, options: CleanOptions) -> String {
    let mut text: String = raw.nfkc().filter(|c| *c != '\u{00AD}').collect();
    text = join_hyphenated_words(&text);

    if options.remove_page_headers {
        text = remove_page_headers(&text);
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>();

    if options.remove_list_numbers {
        strip_list_numbers(&collapsed).join(" ")
    } else {
        collapsed.join(" ")
    }
}

/// `infor-\nmation` and `infor- mation` both become `information`.
fn join_hyphenated_words(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '-' | '\u{2013}') && i > 0 && chars[i - 1].is_alphanumeric() {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && chars[j].is_alphanumeric() {
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

fn page_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:page\s+|seite\s+)?\d+\s*$").expect("valid page header regex")
    })
}

/// Drop lines holding only a page number (`12`, `Page 12`).
fn remove_page_headers(input: &str) -> String {
    input
        .lines()
        .filter(|line| !page_header_re().is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove list enumerators such as `1.` and `12.` when a word follows.
///
/// Four-digit tokens are left alone so years at a sentence end survive.
fn strip_list_numbers<'a>(words: &[&'a str]) -> Vec<&'a str> {
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .filter(|(idx, word)| *idx == last || !is_list_number(word))
        .map(|(_, word)| *word)
        .collect()
}

fn is_list_number(word: &str) -> bool {
    match word.strip_suffix('.') {
        Some(digits) => {
            !digits.is_empty() && digits.len() <= 3 && digits.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

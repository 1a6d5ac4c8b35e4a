// crates/core/src/locale.rs
//! Per-language protocol table.
//!
//! Every string the generator protocol depends on lives here: prompt text,
//! answer/citation labels, the no-answer sentinel, section headers, the
//! preamble the model likes to emit, meta-refusal patterns and stopwords.
//! The prompt builder, response parser and grounding validator all read
//! from the same [`Locale`], so changing a label changes it everywhere.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Deployment language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(alias = "en")]
    English,
    #[serde(alias = "de")]
    German,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::English, Language::German];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::German => "de",
        }
    }

    /// The compiled protocol table for this language.
    pub fn locale(self) -> &'static Locale {
        static EN: OnceLock<Locale> = OnceLock::new();
        static DE: OnceLock<Locale> = OnceLock::new();
        match self {
            Self::English => EN.get_or_init(|| Locale::compile(Self::English, &ENGLISH)),
            Self::German => DE.get_or_init(|| Locale::compile(Self::German, &GERMAN)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "de" | "german" | "deutsch" => Ok(Self::German),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Raw strings for one language.
pub struct LocaleStrings {
    pub answer_label: &'static str,
    pub citation_label: &'static str,
    /// The literal the model is told to emit when it has no answer.
    pub no_answer: &'static str,
    /// Label introducing the chunk inside the prompt (`Section 3:`).
    pub section_label: &'static str,
    /// Header of each persisted result section (`Result for section 3:`).
    pub result_header: &'static str,
    pub question_label: &'static str,
    pub system_message: &'static str,
    pub single_question_intro: &'static str,
    pub multi_question_intro: &'static str,
    preamble: &'static str,
    meta_patterns: &'static [&'static str],
    stopwords: &'static [&'static str],
}

/// A [`LocaleStrings`] table with its patterns compiled.
pub struct Locale {
    pub language: Language,
    pub strings: &'static LocaleStrings,
    preamble: Regex,
    answer_label: Regex,
    citation_label: Regex,
    meta_patterns: Vec<Regex>,
    stopwords: HashSet<&'static str>,
    no_answer_normalized: String,
}

impl Locale {
    fn compile(language: Language, strings: &'static LocaleStrings) -> Self {
        let label = |name: &str| {
            Regex::new(&format!(r"(?i){}\s*[:\-]\s*(.*)$", regex_lite::escape(name)))
                .expect("valid label regex")
        };
        Self {
            language,
            strings,
            preamble: Regex::new(strings.preamble).expect("valid preamble regex"),
            answer_label: label(strings.answer_label),
            citation_label: label(strings.citation_label),
            meta_patterns: strings
                .meta_patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid meta pattern"))
                .collect(),
            stopwords: strings.stopwords.iter().copied().collect(),
            no_answer_normalized: normalize_sentinel(strings.no_answer),
        }
    }

    /// Remove a leading "Here are the answers..." line, if present.
    pub fn strip_preamble<'a>(&self, text: &'a str) -> &'a str {
        let trimmed = text.trim_start();
        match self.preamble.find(trimmed) {
            Some(m) if m.start() == 0 => &trimmed[m.end()..],
            _ => trimmed,
        }
    }

    /// Text after an answer label on this line, if the line carries one.
    pub fn answer_field<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.answer_label
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }

    pub fn citation_field<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.citation_label
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }

    /// Whether `text` is the no-answer sentinel, ignoring case, trailing
    /// punctuation and `_` vs space. The English sentinel is accepted in
    /// every language.
    pub fn is_no_answer(&self, text: &str) -> bool {
        let normalized = normalize_sentinel(text);
        normalized == self.no_answer_normalized || normalized == "no answer"
    }

    /// Whether a (lower-cased) citation talks about the text instead of
    /// quoting it, e.g. "the term is not mentioned".
    pub fn is_meta_refusal(&self, citation_lower: &str) -> bool {
        self.meta_patterns.iter().any(|re| re.is_match(citation_lower))
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }
}

fn normalize_sentinel(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace('_', " ");
    let stripped = lowered
        .trim_matches(|c: char| c == '"' || c == '*' || c == '\'')
        .trim_end_matches(|c: char| matches!(c, '!' | '.' | '?') || c.is_whitespace());
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Marker written to result files for an unanswered question. Language
/// neutral so downstream readers never need the locale.
pub const NO_ANSWER_MARKER: &str = "NO_ANSWER";

pub static ENGLISH: LocaleStrings = LocaleStrings {
    answer_label: "Answer",
    citation_label: "Citation",
    no_answer: "NO ANSWER!",
    section_label: "Section",
    result_header: "Result for section",
    question_label: "Question",
    system_message: "System: You are a conscientious assistant. Respond solely based on the provided excerpt. \
Rules:\n\
1) For each question provide exactly ONE sentence OR exactly 'NO ANSWER!'.\n\
2) If the excerpt does not contain sufficient information OR you cannot give a literal quote, respond 'NO ANSWER!'.\n\
3) After each answer there must be a line 'Citation:' with a short literal quote (max 20 words) from the excerpt; \
for 'NO ANSWER!' do not output a citation line.\n\
4) Do not fabricate citations. No prior knowledge, only the excerpt.\n\
Format per question:\n\
<Nr>. Answer: <one sentence or NO ANSWER!>\n   Citation: \"<literal quote from the excerpt>\"",
    single_question_intro: "Answer the following question solely based on the provided excerpt. \
If the excerpt does not contain sufficient information OR no literal quote is possible, output exactly 'NO ANSWER!'. \
Then output 'Citation:' with a short literal quote (max 20 words) from the excerpt.",
    multi_question_intro: "Answer the following questions solely based on the provided excerpt. \
For each question: exactly ONE sentence OR exactly 'NO ANSWER!'. \
If no literal quote is possible, output 'NO ANSWER!'. \
After each answer: 'Citation:' with a short literal quote (max 20 words) from the excerpt.",
    preamble: r"(?i)^here\s+are\s+the\s+answers[^\n]*(?:\n|$)",
    meta_patterns: &[
        r"\bno(?:\s+\S+){0,3}\s+term",
        r"nowhere\s+in\s+the\s+text",
        r"not\s+mentioned",
        r"no\s+literal\s+quote",
        r"no\s+answer",
    ],
    stopwords: ENGLISH_STOPWORDS,
};

pub static GERMAN: LocaleStrings = LocaleStrings {
    answer_label: "Antwort",
    citation_label: "Beleg",
    no_answer: "KEINE ANTWORT!",
    section_label: "Textabschnitt",
    result_header: "Ergebnis für Abschnitt",
    question_label: "Frage",
    system_message: "System: Du bist ein gewissenhafter Assistent. Antworte ausschließlich auf Basis des bereitgestellten Abschnitts. \
Regeln:\n\
1) Für jede Frage genau EIN Satz ODER exakt 'KEINE ANTWORT!'.\n\
2) Wenn der Abschnitt keine ausreichenden Informationen enthält ODER du kein wörtliches Zitat geben kannst, gib 'KEINE ANTWORT!'.\n\
3) Nach jeder Antwort muss eine Zeile 'Beleg:' mit einem kurzen wörtlichen Zitat (max. 20 Wörter) aus dem Abschnitt folgen; \
bei 'KEINE ANTWORT!' gib KEINE Beleg-Zeile aus.\n\
4) Erfinde keine Belege. Kein Vorwissen, nur Abschnitt.\n\
Format pro Frage:\n\
<Nr>. Antwort: <ein Satz oder KEINE ANTWORT!>\n   Beleg: \"<wörtliches Zitat aus dem Abschnitt>\"",
    single_question_intro: "Beantworte die folgende Frage ausschließlich auf Basis des bereitgestellten Abschnitts. \
Wenn der Abschnitt keine ausreichenden Informationen enthält ODER kein wörtliches Zitat möglich ist, gib exakt 'KEINE ANTWORT!'. \
Gib danach 'Beleg:' mit einem kurzen wörtlichen Zitat (max. 20 Wörter) aus dem Abschnitt an.",
    multi_question_intro: "Beantworte die folgenden Fragen ausschließlich auf Basis des bereitgestellten Abschnitts. \
Für jede Frage: genau EIN Satz ODER exakt 'KEINE ANTWORT!'. \
Wenn kein wörtliches Zitat möglich ist, gib 'KEINE ANTWORT!'. \
Nach jeder Antwort: 'Beleg:' mit einem kurzen wörtlichen Zitat (max. 20 Wörter) aus dem Abschnitt.",
    preamble: r"(?i)^hier\s+sind\s+die\s+antworten[^\n]*(?:\n|$)",
    meta_patterns: &[
        r"\bkein\S*(?:\s+\S+){0,3}\s+begriff",
        r"nirgendwo\s+im\s+text",
        r"nicht\s+erwähnt",
        r"kein\s+wörtliches\s+zitat",
        r"keine\s+antwort",
    ],
    stopwords: GERMAN_STOPWORDS,
};

const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "couldn't", "did", "didn't", "do", "does", "doesn't", "doing", "don't",
    "down", "during", "each", "few", "for", "from", "further", "had", "hadn't", "has", "hasn't",
    "have", "haven't", "having", "he", "her", "here", "hers", "herself", "him", "himself", "his",
    "how", "i", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just", "me",
    "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "now", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same",
    "shan't", "she", "should", "shouldn't", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "very", "was", "wasn't", "we", "were", "weren't", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "won't", "would",
    "wouldn't", "you", "your", "yours", "yourself", "yourselves", "also", "mentioned", "according",
    "text", "paper", "study", "describe", "described", "whether",
];

const GERMAN_STOPWORDS: &[&str] = &[
    "aber", "alle", "allem", "allen", "aller", "alles", "als", "also", "am", "an", "ander",
    "andere", "anderem", "anderen", "anderer", "anderes", "anderm", "andern", "anderr", "anders",
    "auch", "auf", "aus", "bei", "bin", "bis", "bist", "da", "damit", "dann", "der", "den", "des",
    "dem", "die", "das", "dass", "daß", "derselbe", "derselben", "denselben", "desselben",
    "demselben", "dieselbe", "dieselben", "dasselbe", "dazu", "dein", "deine", "deinem", "deinen",
    "deiner", "deines", "denn", "derer", "dessen", "dich", "dir", "du", "dies", "diese", "diesem",
    "diesen", "dieser", "dieses", "doch", "dort", "durch", "ein", "eine", "einem", "einen",
    "einer", "eines", "einig", "einige", "einigem", "einigen", "einiger", "einiges", "einmal",
    "er", "ihn", "ihm", "es", "etwas", "euer", "eure", "eurem", "euren", "eurer", "eures", "für",
    "gegen", "gewesen", "hab", "habe", "haben", "hat", "hatte", "hatten", "hier", "hin", "hinter",
    "ich", "mich", "mir", "ihr", "ihre", "ihrem", "ihren", "ihrer", "ihres", "euch", "im", "in",
    "indem", "ins", "ist", "jede", "jedem", "jeden", "jeder", "jedes", "jene", "jenem", "jenen",
    "jener", "jenes", "jetzt", "kann", "kein", "keine", "keinem", "keinen", "keiner", "keines",
    "können", "könnte", "machen", "man", "manche", "manchem", "manchen", "mancher", "manches",
    "mein", "meine", "meinem", "meinen", "meiner", "meines", "mit", "muss", "musste", "nach",
    "nicht", "nichts", "noch", "nun", "nur", "ob", "oder", "ohne", "sehr", "sein", "seine",
    "seinem", "seinen", "seiner", "seines", "selbst", "sich", "sie", "ihnen", "sind", "so",
    "solche", "solchem", "solchen", "solcher", "solches", "soll", "sollte", "sondern", "sonst",
    "über", "um", "und", "uns", "unsere", "unserem", "unseren", "unser", "unseres", "unter",
    "viel", "vom", "von", "vor", "während", "war", "waren", "warst", "was", "weg", "weil",
    "weiter", "welche", "welchem", "welchen", "welcher", "welches", "wenn", "werde", "werden",
    "wie", "wieder", "will", "wir", "wird", "wirst", "wo", "wollen", "wollte", "würde", "würden",
    "zu", "zum", "zur", "zwar", "zwischen", "sowie", "geht", "gut", "eignet", "ganzes", "enge",
    "dafür", "eng", "etwa", "wurde", "wurden", "gibt", "laut", "text",
];

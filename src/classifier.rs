//! Job Post Classification
//!
//! Conjunctive keyword/glyph filter separating genuine job postings from
//! advertisements, pinned messages and chatter. Tuned against false positives.

use once_cell::sync::Lazy;
use regex::Regex;

/// Advertisement markers, anchored at the start except for `pinned`.
static AD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\[?реклама\]?",
        r"^sponsored",
        r"^рассыли",
        r"pinned",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

const SPAM_KEYWORDS: &[&str] = &["спам", "реклама", "pinned", "закреплено"];

const JOB_KEYWORDS: &[&str] = &[
    "вакансия",
    "работа",
    "соискатель",
    "специалист",
    "менеджер",
    "помощь",
    "услуга",
    "разработка",
    "сбор",
    "написание",
    "кампания",
    "тип работы",
    "оплата",
    "опыт",
    "зарплата",
    "требуются",
    "ищу",
    "ищем",
];

/// Glyphs the channels use to flag postings.
const JOB_GLYPHS: &[&str] = &["👔", "💼", "📌"];

/// How far into `title + description` a glyph may appear.
const GLYPH_WINDOW_CHARS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct ContentClassifier;

impl ContentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Advertisement markers at the start of the (lowercased, trimmed) text.
    pub fn is_advertisement(&self, text: &str) -> bool {
        let clean = text.trim().to_lowercase();
        AD_PATTERNS.iter().any(|re| re.is_match(&clean))
            || SPAM_KEYWORDS.iter().any(|kw| clean.starts_with(kw))
    }

    pub fn has_job_keyword(&self, text: &str) -> bool {
        JOB_KEYWORDS.iter().any(|kw| text.contains(kw))
    }

    /// Glyph in the title, or within the first characters of `title + description`.
    pub fn has_job_glyph(&self, title: &str, description: &str) -> bool {
        if JOB_GLYPHS.iter().any(|g| title.contains(g)) {
            return true;
        }
        let window: String = title
            .chars()
            .chain(description.chars())
            .take(GLYPH_WINDOW_CHARS)
            .collect();
        JOB_GLYPHS.iter().any(|g| window.contains(g))
    }

    /// Accept only non-advertisements carrying both a job keyword and a job glyph.
    pub fn is_job_post(&self, title: &str, description: &str) -> bool {
        let combined = format!("{} {}", title, description).to_lowercase();

        if self.is_advertisement(&combined) {
            return false;
        }

        self.has_job_keyword(&combined) && self.has_job_glyph(title, description)
    }
}

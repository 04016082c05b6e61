//! Labeled Field Extraction
//!
//! Splits post text into title/description and pulls labeled values
//! ("Оплата: 500", "Тип работы" on its own line followed by the value, ...).

use regex::RegexBuilder;

pub const MAX_TITLE_CHARS: usize = 150;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_FIELD_CHARS: usize = 200;

/// Alternative label spellings for each labeled field, in priority order.
pub struct FieldLabels;

impl FieldLabels {
    pub const WORK_TYPE: &'static [&'static str] = &["тип работы", "type"];
    pub const PAYMENT: &'static [&'static str] = &["оплата", "payment"];
    pub const DEADLINE: &'static [&'static str] = &["сроки", "deadline", "срок"];
}

/// First `max` characters of `text` (character-safe).
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Title is the first non-blank line; description is the whole text. Both truncated.
pub fn split_text(text: &str) -> (String, String) {
    let title = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| truncate_chars(line, MAX_TITLE_CHARS))
        .unwrap_or_default();
    let description = truncate_chars(text, MAX_DESCRIPTION_CHARS);
    (title, description)
}

/// Value following the first label found. Labels are tried in the order given,
/// each over all lines top to bottom; matching is case-insensitive.
///
/// The value is the rest of the line after the label (separators trimmed), or
/// the next non-blank line when the label stands alone. Empty if nothing matches.
pub fn extract_field(text: &str, labels: &[&str]) -> String {
    let lines: Vec<&str> = text.lines().collect();

    for label in labels {
        let Ok(pattern) = RegexBuilder::new(&regex::escape(label))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };

        for (index, line) in lines.iter().enumerate() {
            let Some(found) = pattern.find(line) else {
                continue;
            };

            let mut value = trim_separators(&line[found.end()..]).to_string();
            if value.is_empty() {
                value = lines[index + 1..]
                    .iter()
                    .map(|l| l.trim())
                    .find(|l| !l.is_empty())
                    .unwrap_or_default()
                    .to_string();
            }

            if !value.is_empty() {
                return truncate_chars(&value, MAX_FIELD_CHARS);
            }
        }
    }

    String::new()
}

fn trim_separators(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches(|c: char| matches!(c, ':' | '-' | '—' | '–' | '='))
        .trim()
}

//! Post Enrichment
//!
//! Pure `Post -> EnrichedPost` stage run after the crawl, as an ordered list of
//! named rules. Each rule is a plain function and can be tested on its own:
//! - `clean_title`: strip decoration glyphs, normalize spacing, shorten
//! - `task_title`: "who is needed for what" when a technology or task type is named
//! - `clean_description`: strip glyphs, collapse whitespace, cap length
//! - `pad_description`: prefix short descriptions with the task
//! - `budget`: numeric range from the payment field, else the description
//! - `tags`: technology keywords and category markers
//! - `deadline_days`: urgency estimate, clamped to a year
//!
//! `EnrichedPost::validate` applies the minimum quality bar.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Post;

pub const MIN_TITLE_CHARS: usize = 5;
pub const MIN_DESCRIPTION_CHARS: usize = 20;
pub const MIN_BUDGET: f64 = 100.0;
pub const DEFAULT_DEADLINE_DAYS: u32 = 7;

const MAX_TITLE_CHARS: usize = 80;
const FALLBACK_TITLE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 1000;

static LEADING_DECORATION: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[\s#\u{2600}-\u{27BF}\u{1F000}-\u{1FFFF}\u{FE0F}\u{200D}\u{3030}]+").ok()
});

static DECORATION: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"[#\u{2600}-\u{27BF}\u{1F000}-\u{1FFFF}\u{FE0F}\u{200D}\u{3030}]").ok()
});

static WHITESPACE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

static COLON_SPACING: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s*:\s*").ok());

/// Tried in order; the first match with a parseable number wins.
static BUDGET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)от\s*(\d+[\s.,]?\d*)\s*до\s*(\d+[\s.,]?\d*)",
        r"(\d+[\s.,]?\d*)\s*[-–—]\s*(\d+[\s.,]?\d*)",
        r"(?i)budget[:\s]*(\d+[\s.,]?\d*)\s*[-–—]\s*(\d+[\s.,]?\d*)",
        r"(?i)цена[:\s]*(\d+[\s.,]?\d*)\s*[-–—]\s*(\d+[\s.,]?\d*)",
        r"(?i)оплат[аиы]?[:\s]*(\d+[\s.,]?\d*)\s*[-–—]\s*(\d+[\s.,]?\d*)",
        r"(?i)стоимость[:\s]*(\d+[\s.,]?\d*)\s*[-–—]\s*(\d+[\s.,]?\d*)",
        r"(?i)(\d+[\s.,]?\d*)\s*(?:руб|р\.|usd|\$|€|₽)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Payment values meaning "no number given".
const BUDGET_SENTINELS: &[&str] = &[
    "договорная",
    "договорная цена",
    "??",
    "?",
    "не указано",
    "не указана",
    "unknown",
    "n/a",
    "none",
    "не известна",
    "не известно",
];

const TECH_KEYWORDS: &[&str] = &[
    "python", "javascript", "js", "php", "java", "c#", "react", "vue", "angular", "node",
    "django", "flask", "laravel", "html", "css", "figma", "wordpress", "telegram", "бот",
];

/// Substring markers and the category tag they imply.
const CATEGORY_MARKERS: &[(&[&str], &str)] = &[
    (&["дизайн", "figma"], "дизайн"),
    (&["сайт", "веб", "landing"], "веб-разработка"),
    (&["бот", "telegram"], "бот"),
    (&["интерфейс", "ui", "ux"], "UI/UX"),
    (&["приложен", "app"], "мобильная разработка"),
    (&["парс", "scrap"], "парсинг"),
    (&["api"], "API"),
    (&["баз", "data", "sql"], "базы данных"),
    (&["карт", "гео", "map"], "карты"),
    (&["финтех", "финанс"], "финтех"),
    (&["seo"], "SEO"),
    (&["бюджет", "оплат", "цена", "стоимость"], "оплачиваемая"),
];

/// Technology named by a generated title; the first match wins.
const TITLE_TECH: &[(&[&str], &str)] = &[
    (&["python", "питон"], "Python"),
    (&["javascript", "js"], "JavaScript"),
    (&["php"], "PHP"),
    (&["c#", ".net"], "C#"),
    (&["java"], "Java"),
    (&["figma"], "Figma"),
    (&["react"], "React"),
    (&["vue"], "Vue"),
    (&["angular"], "Angular"),
    (&["html", "css"], "HTML/CSS"),
];

/// Task type named by a generated title; the first match wins.
const TITLE_TASKS: &[(&[&str], &str)] = &[
    (&["дизайн", "design", "figma"], "дизайн"),
    (&["сайт", "веб", "web", "landing"], "сайт"),
    (&["бот", "bot", "telegram"], "бота"),
    (&["интерфейс", "ui", "ux"], "интерфейс"),
    (&["приложен", "app", "мобильн"], "приложение"),
    (&["парс", "scrap", "краул"], "парсер"),
    (&["api", "интеграц"], "API"),
    (&["карт", "гео", "map"], "карты"),
];

const FALLBACK_TITLE: &str = "Нужно выполнить задачу";

static HOURS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d+\s*(час|часов)").ok());

static DAYS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(\d+)\s*дн[ея]й?").ok());

static MONTHS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d+\s*мес").ok());

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub from: f64,
    pub to: f64,
}

/// A post plus the fields derived from it. The original post is kept untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedPost {
    pub post: Post,
    pub title: String,
    pub description: String,
    pub budget: Option<Budget>,
    pub tags: Vec<String>,
    pub deadline_days: u32,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("title too short or missing")]
    TitleTooShort,
    #[error("description too short or missing")]
    DescriptionTooShort,
    #[error("budget too low: {0}")]
    BudgetTooLow(f64),
}

impl EnrichedPost {
    fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            description: post.description.clone(),
            post: post.clone(),
            budget: None,
            tags: Vec::new(),
            deadline_days: DEFAULT_DEADLINE_DAYS,
        }
    }

    pub fn validate(&self) -> Result<(), Rejection> {
        if self.title.trim().chars().count() < MIN_TITLE_CHARS {
            return Err(Rejection::TitleTooShort);
        }
        if self.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(Rejection::DescriptionTooShort);
        }
        match self.budget {
            Some(budget) if budget.from < MIN_BUDGET => Err(Rejection::BudgetTooLow(budget.from)),
            _ => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

pub struct EnrichRule {
    pub name: &'static str,
    pub apply: fn(&mut EnrichedPost),
}

pub static RULES: &[EnrichRule] = &[
    EnrichRule { name: "clean_title", apply: apply_clean_title },
    EnrichRule { name: "task_title", apply: apply_task_title },
    EnrichRule { name: "clean_description", apply: apply_clean_description },
    EnrichRule { name: "pad_description", apply: apply_pad_description },
    EnrichRule { name: "budget", apply: apply_budget },
    EnrichRule { name: "tags", apply: apply_tags },
    EnrichRule { name: "deadline_days", apply: apply_deadline_days },
];

pub fn enrich(post: &Post) -> EnrichedPost {
    let mut enriched = EnrichedPost::from_post(post);
    for rule in RULES {
        (rule.apply)(&mut enriched);
    }
    enriched
}

fn apply_clean_title(e: &mut EnrichedPost) {
    e.title = clean_title(&e.post.title, &e.post.description);
}

fn apply_task_title(e: &mut EnrichedPost) {
    e.title = task_title(&e.title, &e.post.description);
}

fn apply_clean_description(e: &mut EnrichedPost) {
    e.description = clean_description(&e.post.description);
}

fn apply_pad_description(e: &mut EnrichedPost) {
    e.description = pad_description(&e.title, &e.description);
}

fn apply_budget(e: &mut EnrichedPost) {
    e.budget = parse_budget(&e.post.payment).or_else(|| parse_budget(&e.post.description));
}

fn apply_tags(e: &mut EnrichedPost) {
    e.tags = infer_tags(&format!("{} {}", e.title, e.description));
}

fn apply_deadline_days(e: &mut EnrichedPost) {
    e.deadline_days = estimate_deadline_days(&e.post.description);
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

fn replace_all(re: &Option<Regex>, text: &str, with: &str) -> String {
    match re {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

fn is_match(re: &Option<Regex>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

pub fn clean_title(raw_title: &str, raw_description: &str) -> String {
    let mut title = replace_all(&LEADING_DECORATION, raw_title, "");
    title = replace_all(&WHITESPACE, &title, " ");
    title = replace_all(&COLON_SPACING, &title, ": ").trim().to_string();

    if title.chars().count() < MIN_TITLE_CHARS && raw_description.chars().count() > MIN_DESCRIPTION_CHARS {
        let description = replace_all(&LEADING_DECORATION, raw_description, "");
        let description = replace_all(&WHITESPACE, &description, " ");
        title = take_chars(&description, FALLBACK_TITLE_CHARS).trim().to_string();
    }

    if title.chars().count() > MAX_TITLE_CHARS {
        let chars: Vec<char> = title.chars().collect();
        let colon = chars.iter().position(|c| *c == ':');
        let dash = chars.iter().position(|c| *c == '-');
        match colon.max(dash) {
            Some(cut) if cut > 20 && cut < 60 => {
                title = chars[..cut].iter().collect::<String>().trim().to_string();
            }
            _ => {
                title = format!("{}...", take_chars(&title, MAX_TITLE_CHARS - 3));
            }
        }
    }

    title
}

/// Whether `text` mentions `marker`. Markers of three characters or fewer must start a word.
fn mentions(text: &str, marker: &str) -> bool {
    if marker.chars().count() > 3 {
        return text.contains(marker);
    }
    text.split(|c: char| !(c.is_alphanumeric() || c == '#'))
        .any(|word| word.starts_with(marker))
}

fn first_named<'a>(text: &str, table: &[(&[&str], &'a str)]) -> Option<&'a str> {
    table
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| mentions(text, m)))
        .map(|(_, name)| *name)
}

/// Rewrite a cleaned title into "who is needed for what" when the post names
/// a technology or a task type.
pub fn task_title(title: &str, raw_description: &str) -> String {
    let text = format!("{} {}", title, raw_description).to_lowercase();
    let tech = first_named(&text, TITLE_TECH);
    let task = first_named(&text, TITLE_TASKS);

    match (tech, task) {
        (Some(tech), Some(task)) => format!("Нужен {} разработчик для {}", tech, task),
        (Some(tech), None) => format!("Требуется {} разработчик", tech),
        (None, Some(task)) => format!("Требуется {}", task),
        (None, None) if title.trim().is_empty() => FALLBACK_TITLE.to_string(),
        (None, None) => title.to_string(),
    }
}

pub fn clean_description(raw: &str) -> String {
    let stripped = replace_all(&DECORATION, raw, "");
    let collapsed = replace_all(&WHITESPACE, &stripped, " ").trim().to_string();
    if collapsed.chars().count() > MAX_DESCRIPTION_CHARS {
        format!("{}...", take_chars(&collapsed, MAX_DESCRIPTION_CHARS - 3))
    } else {
        collapsed
    }
}

/// Give an empty or very short description the task context from the title.
pub fn pad_description(title: &str, description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        format!("Задача: {}. Требуется выполнить в кратчайшие сроки.", title)
    } else if description.chars().count() < MIN_DESCRIPTION_CHARS {
        format!("Задача: {}. {}", title, description)
    } else {
        description.to_string()
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    digits.replacen(',', ".", 1).parse::<f64>().ok()
}

pub fn parse_budget(text: &str) -> Option<Budget> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() || BUDGET_SENTINELS.contains(&lower.as_str()) {
        return None;
    }

    for pattern in BUDGET_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(first) = caps.get(1).and_then(|m| parse_amount(m.as_str())) else {
                continue;
            };
            let second = caps
                .get(2)
                .and_then(|m| parse_amount(m.as_str()))
                .unwrap_or(first);
            return Some(Budget {
                from: first.min(second),
                to: first.max(second),
            });
        }
    }
    None
}

pub fn infer_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: String| {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    for word in lower.split_whitespace() {
        let word: String = word.chars().filter(|c| c.is_alphanumeric() || *c == '#').collect();
        if TECH_KEYWORDS.contains(&word.as_str()) {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                push(first.to_uppercase().chain(chars).collect());
            }
        }
    }

    for (needles, tag) in CATEGORY_MARKERS {
        if needles.iter().any(|n| lower.contains(n)) {
            push(tag.to_string());
        }
    }

    tags
}

pub fn estimate_deadline_days(description: &str) -> u32 {
    let desc = description.to_lowercase();

    let days = if ["срочн", "urgent", "быстр"].iter().any(|k| desc.contains(k)) {
        1
    } else if desc.contains("скоро") || desc.contains("в течение") || is_match(&HOURS, &desc) {
        1
    } else if desc.contains("недел") || is_match(&DAYS, &desc) {
        DAYS.as_ref()
            .and_then(|re| re.captures(&desc))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().parse::<u32>().unwrap_or(365))
            .unwrap_or(DEFAULT_DEADLINE_DAYS)
    } else if desc.contains("месяц") || is_match(&MONTHS, &desc) {
        30
    } else if desc.contains("год") {
        365
    } else {
        DEFAULT_DEADLINE_DAYS
    };

    days.clamp(1, 365)
}

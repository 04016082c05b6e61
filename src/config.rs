//! Crawl Configuration
//!
//! Loads `config/crawl.yml` and turns it into explicit values:
//! - `CrawlConfig`: everything the pipeline needs (sources, cutoff, limits, delays)
//! - `AppConfig`: the crawl config plus binary wiring (webdriver, store)
//! - `CutoffSpec`: absolute instant or "now minus N days"

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dom::FeedSelectors;
use crate::error::CrawlError;

pub const CONFIG_FILE: &str = "config/crawl.yml";

/// Earliest publication instant a run accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CutoffSpec {
    Since { since: String },
    DaysBack { days_back: i64 },
}

impl CutoffSpec {
    /// Resolve against `now`. Accepts RFC 3339 instants or bare `YYYY-MM-DD` dates (UTC midnight).
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, CrawlError> {
        match self {
            CutoffSpec::Since { since } => parse_instant(since).ok_or_else(|| {
                CrawlError::Configuration(format!(
                    "cutoff '{}' is not an RFC 3339 instant or YYYY-MM-DD date",
                    since
                ))
            }),
            CutoffSpec::DaysBack { days_back } if *days_back < 0 => Err(CrawlError::Configuration(
                format!("cutoff days_back must not be negative, got {}", days_back),
            )),
            CutoffSpec::DaysBack { days_back } => ChronoDuration::try_days(*days_back)
                .and_then(|back| now.checked_sub_signed(back))
                .ok_or_else(|| {
                    CrawlError::Configuration(format!(
                        "cutoff days_back {} is out of range",
                        days_back
                    ))
                }),
        }
    }
}

pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parameters of a crawl run. Passed by value into the orchestrator; nothing is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub sources: Vec<String>,
    #[serde(default)]
    pub cutoff: Option<CutoffSpec>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_scroll_steps")]
    pub scroll_steps: u32,
    #[serde(default = "default_scroll_amount_px")]
    pub scroll_amount_px: i64,
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
    #[serde(default = "default_page_load_delay_ms")]
    pub page_load_delay_ms: u64,
    #[serde(default = "default_selector_wait_timeout_ms")]
    pub selector_wait_timeout_ms: u64,
    #[serde(default)]
    pub selectors: FeedSelectors,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_scroll_steps() -> u32 {
    3
}

fn default_scroll_amount_px() -> i64 {
    1080
}

fn default_scroll_delay_ms() -> u64 {
    1000
}

fn default_page_load_delay_ms() -> u64 {
    5000
}

fn default_selector_wait_timeout_ms() -> u64 {
    10_000
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            cutoff: None,
            max_iterations: default_max_iterations(),
            scroll_steps: default_scroll_steps(),
            scroll_amount_px: default_scroll_amount_px(),
            scroll_delay_ms: default_scroll_delay_ms(),
            page_load_delay_ms: default_page_load_delay_ms(),
            selector_wait_timeout_ms: default_selector_wait_timeout_ms(),
            selectors: FeedSelectors::default(),
        }
    }
}

impl CrawlConfig {
    pub fn with_sources(sources: Vec<String>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn page_load_delay(&self) -> Duration {
        Duration::from_millis(self.page_load_delay_ms)
    }

    pub fn selector_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_wait_timeout_ms)
    }

    /// Check the limits that do not depend on the source list.
    pub fn validate_limits(&self) -> Result<(), CrawlError> {
        if self.max_iterations == 0 {
            return Err(CrawlError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Full validation of this config, including its own source list and cutoff.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), CrawlError> {
        self.validate_limits()?;
        validate_sources(&self.sources)?;
        self.resolve_cutoff(now)?;
        Ok(())
    }

    pub fn resolve_cutoff(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, CrawlError> {
        self.cutoff.as_ref().map(|spec| spec.resolve(now)).transpose()
    }
}

/// A run needs at least one source, each a distinct http(s) URL.
/// Sources are compared after trimming.
pub fn validate_sources(sources: &[String]) -> Result<(), CrawlError> {
    if sources.is_empty() {
        return Err(CrawlError::Configuration("source list is empty".to_string()));
    }
    let mut seen = HashSet::new();
    for source in sources {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(CrawlError::Configuration("source URL is blank".to_string()));
        }
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(CrawlError::Configuration(format!(
                "source URL '{}' has no http/https scheme",
                trimmed
            )));
        }
        if !seen.insert(trimmed) {
            return Err(CrawlError::Configuration(format!(
                "source URL '{}' is listed more than once",
                trimmed
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Json,
    Sqlite,
}

/// Configuration of the crawl binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub crawl: CrawlConfig,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub store: StoreKind,
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl AppConfig {
    pub fn data_path(&self, root: &str) -> PathBuf {
        PathBuf::from(root).join(&self.data_dir)
    }
}

/// Load `config/crawl.yml` under `root`.
pub fn load_config(root: &str) -> Result<AppConfig> {
    let path = Path::new(root).join(CONFIG_FILE);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read crawl config from {:?}", path))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig =
        serde_yaml::from_str(content).with_context(|| "Failed to parse crawl config YAML")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = parse_config("sources:\n  - https://t.me/s/digitaltender\n").unwrap();
        assert_eq!(config.crawl.sources, vec!["https://t.me/s/digitaltender"]);
        assert_eq!(config.crawl.max_iterations, 10);
        assert_eq!(config.crawl.scroll_steps, 3);
        assert_eq!(config.crawl.selector_wait_timeout_ms, 10_000);
        assert_eq!(config.crawl.selectors.post, ".tgme_widget_message");
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert_eq!(config.store, StoreKind::Json);
        assert!(config.crawl.cutoff.is_none());
    }

    #[test]
    fn test_parse_cutoff_variants() {
        let config = parse_config(
            "sources: [\"https://t.me/s/a\"]\ncutoff:\n  days_back: 3\nstore: sqlite\n",
        )
        .unwrap();
        assert_eq!(config.crawl.cutoff, Some(CutoffSpec::DaysBack { days_back: 3 }));
        assert_eq!(config.store, StoreKind::Sqlite);

        let config = parse_config(
            "sources: [\"https://t.me/s/a\"]\ncutoff:\n  since: \"2024-01-10\"\n",
        )
        .unwrap();
        assert_eq!(
            config.crawl.cutoff,
            Some(CutoffSpec::Since { since: "2024-01-10".to_string() })
        );
    }

    #[test]
    fn test_cutoff_resolution() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        let days = CutoffSpec::DaysBack { days_back: 5 };
        assert_eq!(days.resolve(now).unwrap(), Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap());

        let date = CutoffSpec::Since { since: "2024-01-10".to_string() };
        assert_eq!(date.resolve(now).unwrap(), Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());

        let instant = CutoffSpec::Since { since: "2024-01-10T03:00:00+03:00".to_string() };
        assert_eq!(instant.resolve(now).unwrap(), Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_cutoff_is_configuration_error() {
        let now = Utc::now();
        let bad = CutoffSpec::Since { since: "last tuesday".to_string() };
        assert!(matches!(bad.resolve(now), Err(CrawlError::Configuration(_))));

        let negative = CutoffSpec::DaysBack { days_back: -1 };
        assert!(matches!(negative.resolve(now), Err(CrawlError::Configuration(_))));
    }

    #[test]
    fn test_out_of_range_days_back_is_configuration_error() {
        let now = Utc::now();
        let huge = CutoffSpec::DaysBack { days_back: i64::MAX / 2 };
        assert!(matches!(huge.resolve(now), Err(CrawlError::Configuration(_))));

        let past_min = CutoffSpec::DaysBack { days_back: 100_000_000 };
        assert!(matches!(past_min.resolve(now), Err(CrawlError::Configuration(_))));
    }

    #[test]
    fn test_validate_sources() {
        assert!(validate_sources(&[]).is_err());
        assert!(validate_sources(&["  ".to_string()]).is_err());
        assert!(validate_sources(&["t.me/s/channel".to_string()]).is_err());
        assert!(validate_sources(&["https://t.me/s/channel".to_string()]).is_ok());
    }

    #[test]
    fn test_duplicate_sources_rejected() {
        let sources = vec![
            "https://t.me/s/channel".to_string(),
            " https://t.me/s/channel ".to_string(),
        ];
        assert!(matches!(validate_sources(&sources), Err(CrawlError::Configuration(_))));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut config = CrawlConfig::with_sources(vec!["https://t.me/s/a".to_string()]);
        config.max_iterations = 0;
        assert!(config.validate(Utc::now()).is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Prefix marking ids generated by the crawler rather than read from the page.
pub const SYNTHETIC_ID_PREFIX: &str = "synthetic-";

/// Identifier of a post, local to its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostId {
    /// Identifier provided by the page (e.g. the message number).
    Source(String),
    /// Generated when the page offers nothing usable; never used for dedup by id.
    Synthetic(String),
}

impl PostId {
    /// Accept a page-provided id; ids that look synthetic or are blank are refused.
    pub fn from_source(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with(SYNTHETIC_ID_PREFIX) {
            return None;
        }
        Some(PostId::Source(raw.to_string()))
    }

    pub fn synthetic() -> Self {
        PostId::Synthetic(format!("{}{}", SYNTHETIC_ID_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, PostId::Synthetic(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            PostId::Source(id) | PostId::Synthetic(id) => id,
        }
    }
}

impl From<String> for PostId {
    fn from(raw: String) -> Self {
        if raw.starts_with(SYNTHETIC_ID_PREFIX) {
            PostId::Synthetic(raw)
        } else {
            PostId::Source(raw)
        }
    }
}

impl From<PostId> for String {
    fn from(id: PostId) -> Self {
        match id {
            PostId::Source(id) | PostId::Synthetic(id) => id,
        }
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content identity of a post, independent of its id.
///
/// SHA-256 of `lowercase(trim(title + "|" + description))`, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(title: &str, description: &str) -> Self {
        let normalized = normalized_content(title, description);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an already computed digest (e.g. read back from a store).
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Fingerprint(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text the fingerprint digest is computed over.
pub fn normalized_content(title: &str, description: &str) -> String {
    format!("{}|{}", title, description).trim().to_lowercase()
}

/// One job posting extracted from a feed page. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub work_type: String,
    #[serde(default)]
    pub payment: String,
    #[serde(default)]
    pub deadline: String,
    pub url: String,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.title, &self.description)
    }

    /// Key used to collapse repeated sightings within one crawl: the id when the
    /// page provided one, otherwise the content fingerprint.
    pub fn sighting_key(&self) -> String {
        match &self.id {
            PostId::Source(id) => format!("id:{}", id),
            PostId::Synthetic(_) => format!("fp:{}", self.fingerprint()),
        }
    }
}

/// Why a source's crawl loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The last scroll revealed nothing new (tail id unchanged).
    NoGrowth,
    /// Posts older than the cutoff were reached.
    Cutoff,
    /// The configured iteration cap was hit.
    IterationCap,
    /// A later snapshot produced no posts at all.
    EndOfFeed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::NoGrowth => "StopNoGrowth",
            StopReason::Cutoff => "StopCutoff",
            StopReason::IterationCap => "StopIterationCap",
            StopReason::EndOfFeed => "StopEndOfFeed",
        };
        f.write_str(label)
    }
}

/// Terminal state of one source in an orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Stopped { reason: StopReason },
    Failed { reason: String },
}

impl SourceOutcome {
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            SourceOutcome::Stopped { reason } => Some(*reason),
            SourceOutcome::Failed { .. } => None,
        }
    }
}

impl fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOutcome::Stopped { reason } => write!(f, "{}", reason),
            SourceOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Accepted posts of one source, in the order they were first seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_url: String,
    pub posts: Vec<Post>,
    /// Posts the crawler returned before cross-source dedup.
    pub crawled: usize,
    pub outcome: SourceOutcome,
}

/// Result of one orchestrated run, sources in configured order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    pub sources: Vec<SourceReport>,
}

impl CrawlReport {
    pub fn posts_by_source(&self) -> HashMap<&str, &[Post]> {
        self.sources
            .iter()
            .map(|s| (s.source_url.as_str(), s.posts.as_slice()))
            .collect()
    }

    pub fn outcome_by_source(&self) -> HashMap<&str, &SourceOutcome> {
        self.sources
            .iter()
            .map(|s| (s.source_url.as_str(), &s.outcome))
            .collect()
    }

    pub fn total_accepted(&self) -> usize {
        self.sources.iter().map(|s| s.posts.len()).sum()
    }

    pub fn all_posts(&self) -> impl Iterator<Item = &Post> {
        self.sources.iter().flat_map(|s| s.posts.iter())
    }
}

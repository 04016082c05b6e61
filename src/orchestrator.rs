//! Multi-Source Orchestration
//!
//! Visits the configured sources strictly in order over one browser session:
//! - each source is crawled by `IncrementalCrawler`
//! - its posts pass through the run's `DedupIndex` before the next source starts,
//!   so a post seen in two sources is attributed to the first
//! - a `SourceFailure` is recorded for that source and the run continues
//!
//! Configuration errors are raised before any navigation. Each report entry
//! keeps the source string exactly as passed; only navigation uses it trimmed.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{validate_sources, CrawlConfig};
use crate::crawler::IncrementalCrawler;
use crate::dedup::DedupIndex;
use crate::error::CrawlError;
use crate::session::BrowserSession;
use crate::types::{CrawlReport, SourceOutcome, SourceReport};

pub struct MultiSourceOrchestrator<S: BrowserSession> {
    session: S,
    crawler: IncrementalCrawler,
    dedup: DedupIndex,
}

impl<S: BrowserSession> MultiSourceOrchestrator<S> {
    pub fn new(session: S, config: CrawlConfig) -> Self {
        Self {
            session,
            crawler: IncrementalCrawler::new(config),
            dedup: DedupIndex::new(),
        }
    }

    /// Start from an index seeded with what the store already holds.
    pub fn with_dedup(mut self, dedup: DedupIndex) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        self.crawler.config()
    }

    pub fn dedup(&self) -> &DedupIndex {
        &self.dedup
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Hand the session back, e.g. to shut the browser down.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Crawl the configured sources with the configured cutoff.
    pub async fn run_configured(&mut self) -> Result<CrawlReport, CrawlError> {
        let cutoff = self.crawler.config().resolve_cutoff(Utc::now())?;
        let sources = self.crawler.config().sources.clone();
        self.crawl(&sources, cutoff).await
    }

    pub async fn crawl(
        &mut self,
        sources: &[String],
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<CrawlReport, CrawlError> {
        run_sources(&mut self.session, &self.crawler, &mut self.dedup, sources, cutoff).await
    }
}

/// One-shot crawl with a fresh dedup index.
pub async fn crawl<S>(
    session: &mut S,
    config: &CrawlConfig,
    sources: &[String],
    cutoff: Option<DateTime<Utc>>,
) -> Result<CrawlReport, CrawlError>
where
    S: BrowserSession + ?Sized,
{
    let crawler = IncrementalCrawler::new(config.clone());
    let mut dedup = DedupIndex::new();
    run_sources(session, &crawler, &mut dedup, sources, cutoff).await
}

async fn run_sources<S>(
    session: &mut S,
    crawler: &IncrementalCrawler,
    dedup: &mut DedupIndex,
    sources: &[String],
    cutoff: Option<DateTime<Utc>>,
) -> Result<CrawlReport, CrawlError>
where
    S: BrowserSession + ?Sized,
{
    crawler.config().validate_limits()?;
    validate_sources(sources)?;

    let mut report = CrawlReport::default();

    for configured in sources {
        let source_url = configured.trim();
        let source_report = match crawler.crawl_source(session, source_url, cutoff).await {
            Ok(crawl) => {
                let crawled = crawl.posts.len();
                let posts = dedup.retain_novel(crawl.posts);
                info!(
                    source = source_url,
                    crawled,
                    accepted = posts.len(),
                    stop_reason = %crawl.stop_reason,
                    "Source done"
                );
                SourceReport {
                    source_url: configured.clone(),
                    posts,
                    crawled,
                    outcome: SourceOutcome::Stopped {
                        reason: crawl.stop_reason,
                    },
                }
            }
            Err(CrawlError::SourceFailure { url, source }) => {
                warn!(source = %url, error = %source, "Source failed, continuing with next");
                SourceReport {
                    source_url: configured.clone(),
                    posts: Vec::new(),
                    crawled: 0,
                    outcome: SourceOutcome::Failed {
                        reason: source.to_string(),
                    },
                }
            }
            Err(e) => return Err(e),
        };
        report.sources.push(source_report);
    }

    info!(
        sources = report.sources.len(),
        accepted = report.total_accepted(),
        "Crawl run complete"
    );
    Ok(report)
}

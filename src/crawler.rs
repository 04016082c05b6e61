//! Incremental Feed Crawler
//!
//! Drives one source through `navigate → wait → (extract → decide → scroll)*`:
//! - selector wait timeouts are logged and the crawl proceeds with what rendered
//! - the cutoff check runs before the no-growth check
//! - `max_iterations` bounds the work done per source
//!
//! Posts re-rendered by later snapshots are collapsed by id (or by content
//! fingerprint when the page offered no id).

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::CrawlConfig;
use crate::error::{CrawlError, SessionError};
use crate::extractor::PostExtractor;
use crate::session::{BrowserSession, WaitOutcome};
use crate::types::{Post, StopReason};

/// Outcome of crawling a single source.
#[derive(Debug, Clone)]
pub struct SourceCrawl {
    pub posts: Vec<Post>,
    pub stop_reason: StopReason,
    /// Snapshots extracted before stopping.
    pub iterations: u32,
}

#[derive(Debug, Clone)]
pub struct IncrementalCrawler {
    config: CrawlConfig,
    extractor: PostExtractor,
}

impl IncrementalCrawler {
    pub fn new(config: CrawlConfig) -> Self {
        let extractor = PostExtractor::new(config.selectors.clone());
        Self { config, extractor }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl `source_url` until a stop condition holds.
    ///
    /// Only navigation and snapshot reads are fatal for the source; they come
    /// back as `CrawlError::SourceFailure`.
    pub async fn crawl_source<S>(
        &self,
        session: &mut S,
        source_url: &str,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<SourceCrawl, CrawlError>
    where
        S: BrowserSession + ?Sized,
    {
        info!(source = source_url, "Loading source");
        session
            .navigate(source_url)
            .await
            .map_err(|e| CrawlError::source_failure(source_url, e))?;
        session.sleep(self.config.page_load_delay()).await;

        let selector = self.extractor.selectors().post.as_str();
        match session
            .wait_for_selector(selector, self.config.selector_wait_timeout())
            .await
        {
            Ok(WaitOutcome::Found) => {}
            Ok(WaitOutcome::TimedOut) => {
                warn!(source = source_url, selector, "Post selector did not appear, using partial render");
            }
            Err(e) => {
                warn!(source = source_url, selector, error = %e, "Post selector wait failed, using partial render");
            }
        }

        let mut accumulated: Vec<Post> = Vec::new();
        let mut sighted: HashSet<String> = HashSet::new();
        let mut last_tail: Option<String> = None;

        for iteration in 0..self.config.max_iterations {
            let html = session
                .current_html()
                .await
                .map_err(|e| CrawlError::source_failure(source_url, e))?;
            let posts = self.extractor.extract(&html, source_url, Utc::now());
            let snapshot_count = iteration + 1;

            if posts.is_empty() && iteration > 0 {
                return Ok(self.finish(source_url, accumulated, StopReason::EndOfFeed, snapshot_count));
            }

            let tail = posts.last().map(Post::sighting_key);

            if let Some(cutoff) = cutoff {
                let (recent, old): (Vec<Post>, Vec<Post>) = posts
                    .into_iter()
                    .partition(|p| p.published_at.map_or(true, |at| at >= cutoff));
                accumulate(&mut accumulated, &mut sighted, recent);
                if !old.is_empty() {
                    debug!(source = source_url, iteration, older = old.len(), "Reached posts past the cutoff");
                    return Ok(self.finish(source_url, accumulated, StopReason::Cutoff, snapshot_count));
                }
            } else {
                accumulate(&mut accumulated, &mut sighted, posts);
            }

            if tail.is_some() && tail == last_tail {
                return Ok(self.finish(source_url, accumulated, StopReason::NoGrowth, snapshot_count));
            }
            last_tail = tail;

            debug!(source = source_url, iteration, posts = accumulated.len(), "Snapshot processed");

            if snapshot_count == self.config.max_iterations {
                break;
            }

            if let Err(e) = self.scroll(session).await {
                warn!(source = source_url, iteration, error = %e, "Scroll failed, ending feed");
                return Ok(self.finish(source_url, accumulated, StopReason::EndOfFeed, snapshot_count));
            }
        }

        let iterations = self.config.max_iterations;
        Ok(self.finish(source_url, accumulated, StopReason::IterationCap, iterations))
    }

    async fn scroll<S>(&self, session: &mut S) -> Result<(), SessionError>
    where
        S: BrowserSession + ?Sized,
    {
        for _ in 0..self.config.scroll_steps {
            session.scroll_by(self.config.scroll_amount_px).await?;
            session.sleep(self.config.scroll_delay()).await;
        }
        Ok(())
    }

    fn finish(&self, source_url: &str, posts: Vec<Post>, stop_reason: StopReason, iterations: u32) -> SourceCrawl {
        info!(
            source = source_url,
            posts = posts.len(),
            iterations,
            stop_reason = %stop_reason,
            "Source crawl finished"
        );
        SourceCrawl {
            posts,
            stop_reason,
            iterations,
        }
    }
}

fn accumulate(accumulated: &mut Vec<Post>, sighted: &mut HashSet<String>, posts: Vec<Post>) {
    for post in posts {
        if sighted.insert(post.sighting_key()) {
            accumulated.push(post);
        }
    }
}

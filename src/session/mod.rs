pub mod snapshot;
pub mod webdriver;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::SessionError;

pub use snapshot::SnapshotSession;
pub use webdriver::WebDriverSession;

/// Result of a bounded selector wait. A timeout is a signal, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Found,
    TimedOut,
}

/// A rendering browser session driven one step at a time.
///
/// Every call completes (or times out) before returning; the crawl loop awaits
/// each step in sequence.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome, SessionError>;

    async fn current_html(&mut self) -> Result<String, SessionError>;

    async fn scroll_by(&mut self, amount: i64) -> Result<(), SessionError>;

    async fn sleep(&mut self, duration: Duration);
}

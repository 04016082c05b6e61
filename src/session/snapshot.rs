use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::{BrowserSession, WaitOutcome};
use crate::error::SessionError;

/// Replays captured page snapshots instead of driving a browser.
///
/// Each source URL maps to a sequence of HTML snapshots. Navigating shows the
/// first one; every scroll advances to the next and stays on the last. Useful
/// for offline re-extraction of saved pages and for tests.
#[derive(Debug, Default)]
pub struct SnapshotSession {
    pages: HashMap<String, Vec<String>>,
    current: Option<(String, usize)>,
    failing: HashMap<String, String>,
    slept: Duration,
    scrolls: u32,
}

impl SnapshotSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, snapshots: Vec<String>) -> Self {
        self.pages.insert(url.to_string(), snapshots);
        self
    }

    /// Navigation to `url` fails with `reason`.
    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.failing.insert(url.to_string(), reason.to_string());
        self
    }

    pub fn total_slept(&self) -> Duration {
        self.slept
    }

    pub fn scroll_count(&self) -> u32 {
        self.scrolls
    }

    fn current_snapshot(&self) -> Option<&String> {
        let (url, index) = self.current.as_ref()?;
        let snapshots = self.pages.get(url)?;
        snapshots.get(*index).or_else(|| snapshots.last())
    }
}

#[async_trait]
impl BrowserSession for SnapshotSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        if let Some(reason) = self.failing.get(url) {
            return Err(SessionError::Navigation(format!("{}: {}", url, reason)));
        }
        if !self.pages.contains_key(url) {
            return Err(SessionError::Navigation(format!("{}: no snapshot recorded", url)));
        }
        self.current = Some((url.to_string(), 0));
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        _selector: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome, SessionError> {
        match self.current_snapshot() {
            Some(html) if !html.trim().is_empty() => Ok(WaitOutcome::Found),
            _ => {
                self.slept += timeout;
                Ok(WaitOutcome::TimedOut)
            }
        }
    }

    async fn current_html(&mut self) -> Result<String, SessionError> {
        self.current_snapshot()
            .cloned()
            .ok_or_else(|| SessionError::Driver("no page loaded".to_string()))
    }

    async fn scroll_by(&mut self, _amount: i64) -> Result<(), SessionError> {
        let Some((_, index)) = self.current.as_mut() else {
            return Err(SessionError::Driver("no page loaded".to_string()));
        };
        *index += 1;
        self.scrolls += 1;
        Ok(())
    }

    async fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scroll_advances_and_sticks_to_last_snapshot() {
        let mut session = SnapshotSession::new()
            .with_page("https://t.me/s/a", vec!["one".to_string(), "two".to_string()]);

        session.navigate("https://t.me/s/a").await.unwrap();
        assert_eq!(session.current_html().await.unwrap(), "one");
        session.scroll_by(100).await.unwrap();
        assert_eq!(session.current_html().await.unwrap(), "two");
        session.scroll_by(100).await.unwrap();
        assert_eq!(session.current_html().await.unwrap(), "two");
        assert_eq!(session.scroll_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_and_failing_urls() {
        let mut session = SnapshotSession::new().with_failure("https://t.me/s/down", "dns error");
        assert!(matches!(
            session.navigate("https://t.me/s/down").await,
            Err(SessionError::Navigation(_))
        ));
        assert!(session.navigate("https://t.me/s/unknown").await.is_err());
        assert!(session.current_html().await.is_err());
    }

    #[tokio::test]
    async fn test_sleep_is_recorded_not_waited() {
        let mut session = SnapshotSession::new();
        session.sleep(Duration::from_secs(60)).await;
        assert_eq!(session.total_slept(), Duration::from_secs(60));
    }
}

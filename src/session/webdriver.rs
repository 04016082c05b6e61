use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::{debug, warn};

use super::{BrowserSession, WaitOutcome};
use crate::error::SessionError;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless Chrome driven through a WebDriver endpoint (e.g. chromedriver on :9515).
pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    pub async fn connect(webdriver_url: &str) -> Result<Self, SessionError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_option(
            "args",
            vec![
                "--headless=new",
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--disable-software-rasterizer",
                "--window-size=1920,1080",
                "--disable-blink-features=AutomationControlled",
            ],
        )?;

        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .map_err(|e| SessionError::Driver(format!("failed to connect to {}: {}", webdriver_url, e)))?;

        debug!(webdriver_url, "Connected to WebDriver");
        Ok(Self { driver })
    }

    /// Close the browser. Call this on every exit path.
    pub async fn quit(self) -> Result<(), SessionError> {
        self.driver.quit().await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| SessionError::Navigation(format!("{}: {}", url, e)))
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome, SessionError> {
        let found = self
            .driver
            .query(By::Css(selector))
            .wait(timeout, WAIT_POLL_INTERVAL)
            .first()
            .await;

        match found {
            Ok(_) => Ok(WaitOutcome::Found),
            Err(e) => {
                warn!(selector, error = %e, "Selector wait ended without a match");
                Ok(WaitOutcome::TimedOut)
            }
        }
    }

    async fn current_html(&mut self) -> Result<String, SessionError> {
        Ok(self.driver.source().await?)
    }

    async fn scroll_by(&mut self, amount: i64) -> Result<(), SessionError> {
        self.driver
            .execute(&format!("window.scrollBy(0, {});", amount), Vec::new())
            .await?;
        Ok(())
    }

    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

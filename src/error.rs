use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrawlError>;

/// Failure reported by a browsing session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser driver error: {0}")]
    Driver(String),
}

impl From<thirtyfour::error::WebDriverError> for SessionError {
    fn from(err: thirtyfour::error::WebDriverError) -> Self {
        SessionError::Driver(err.to_string())
    }
}

/// A single post node that could not be turned into a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("post node carries no text")]
    EmptyNode,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    /// Invalid run parameters; raised before any navigation happens.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The browser could not serve this source; other sources still run.
    #[error("source {url} failed: {source}")]
    SourceFailure {
        url: String,
        #[source]
        source: SessionError,
    },
}

impl CrawlError {
    pub fn source_failure(url: &str, source: SessionError) -> Self {
        CrawlError::SourceFailure {
            url: url.to_string(),
            source,
        }
    }
}

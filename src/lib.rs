//! Job Feed Crawler Library
//!
//! Crawls public channel feed pages, extracts job postings and deduplicates
//! them across sources and runs.

pub mod classifier;
pub mod config;
pub mod crawler;
pub mod dedup;
pub mod dom;
pub mod enrich;
pub mod error;
pub mod extractor;
pub mod fields;
pub mod notify;
pub mod orchestrator;
pub mod session;
pub mod store;
pub mod timestamp;
pub mod types;

pub use error::{CrawlError, ExtractionError, SessionError};
pub use orchestrator::{crawl, MultiSourceOrchestrator};
pub use types::*;

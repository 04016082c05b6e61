use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crawl_job_feeds::config::{load_config, CutoffSpec};
use crawl_job_feeds::dedup::DedupIndex;
use crawl_job_feeds::notify;
use crawl_job_feeds::orchestrator::MultiSourceOrchestrator;
use crawl_job_feeds::session::WebDriverSession;
use crawl_job_feeds::store::{open_store, PostStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crawl_job_feeds=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root = std::env::var("ROOT").unwrap_or_else(|_| ".".to_string());

    let mut config = load_config(&root)?;
    if let Ok(since) = std::env::var("CRAWL_SINCE") {
        info!(since = %since, "Cutoff overridden from CRAWL_SINCE");
        config.crawl.cutoff = Some(CutoffSpec::Since { since });
    }

    let data_path = config.data_path(&root);
    let mut store = open_store(config.store, Path::new(&data_path))?;
    let dedup = DedupIndex::from_store(store.as_ref()).context("Failed to load existing posts")?;
    info!(
        known_ids = dedup.seen_id_count(),
        known_fingerprints = dedup.seen_fingerprint_count(),
        "Dedup index seeded"
    );

    let session = WebDriverSession::connect(&config.webdriver_url)
        .await
        .with_context(|| format!("Failed to start browser session at {}", config.webdriver_url))?;

    let mut orchestrator = MultiSourceOrchestrator::new(session, config.crawl.clone()).with_dedup(dedup);
    let result = orchestrator.run_configured().await;

    if let Err(e) = orchestrator.into_session().quit().await {
        warn!(error = %e, "Failed to close browser session");
    }

    let report = result?;

    for source in &report.sources {
        let outcome = store
            .append(&source.posts)
            .with_context(|| format!("Failed to store posts from {}", source.source_url))?;
        info!(
            source = %source.source_url,
            crawled = source.crawled,
            accepted = outcome.accepted,
            skipped = outcome.skipped,
            outcome = %source.outcome,
            "Source summary"
        );
    }

    if report.total_accepted() == 0 {
        info!("No new posts found");
    }

    notify::send_run_summary(&report).await;

    Ok(())
}

//! Crawl Configuration Validation Binary
//!
//! Validates config/crawl.yml before a crawl run:
//! - Checks the source list (non-empty, http/https URLs, no duplicates)
//! - Checks iteration and scroll limits
//! - Resolves the cutoff (including a `CRAWL_SINCE` override)

use anyhow::{Context, Result};
use chrono::Utc;

use crawl_job_feeds::config::{load_config, validate_sources, CutoffSpec};

fn main() -> Result<()> {
    let root = std::env::var("ROOT").unwrap_or_else(|_| ".".to_string());

    println!("=== Crawl Configuration Validator ===");

    let mut config = load_config(&root).context("Failed to load config/crawl.yml")?;
    if let Ok(since) = std::env::var("CRAWL_SINCE") {
        config.crawl.cutoff = Some(CutoffSpec::Since { since });
    }
    let crawl = &config.crawl;
    let now = Utc::now();

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Err(e) = validate_sources(&crawl.sources) {
        errors.push(e.to_string());
    }

    if let Err(e) = crawl.validate_limits() {
        errors.push(e.to_string());
    }

    for source in &crawl.sources {
        if !source.contains("/s/") {
            warnings.push(format!(
                "Source '{}' is not a channel preview URL (https://t.me/s/<channel>)",
                source
            ));
        }
    }

    match crawl.resolve_cutoff(now) {
        Ok(Some(cutoff)) if cutoff > now => {
            warnings.push(format!("Cutoff {} is in the future; every post will be excluded", cutoff));
        }
        Ok(Some(cutoff)) => println!("Cutoff resolves to {}", cutoff.to_rfc3339()),
        Ok(None) => println!("No cutoff configured; feeds are crawled up to the iteration cap"),
        Err(e) => errors.push(e.to_string()),
    }

    if crawl.scroll_steps == 0 {
        warnings.push("scroll_steps is 0; only the first rendered page is read".to_string());
    }

    if crawl.selector_wait_timeout_ms == 0 {
        warnings.push("selector_wait_timeout_ms is 0; pages are read before the feed renders".to_string());
    }

    if errors.is_empty() && warnings.is_empty() {
        println!("✓ All {} sources are valid", crawl.sources.len());
        return Ok(());
    }

    if !errors.is_empty() {
        println!("\n❌ ERRORS (must fix):");
        for error in &errors {
            println!("  - {}", error);
        }
    }

    if !warnings.is_empty() {
        println!("\n⚠️  WARNINGS:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    if !errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

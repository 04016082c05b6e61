use anyhow::Result;
use reqwest::Client;
use std::env;
use tracing::{info, warn};

use crate::enrich;
use crate::types::CrawlReport;

/// Titles listed in a summary message.
const SUMMARY_TITLES: usize = 10;

/// Human-readable summary of a run: per-source counts and stop reasons, then
/// the first accepted posts that pass enrichment validation.
pub fn format_run_summary(report: &CrawlReport) -> String {
    let mut lines = vec![format!(
        "[Job Feeds] {} new posts from {} sources",
        report.total_accepted(),
        report.sources.len()
    )];

    for source in &report.sources {
        lines.push(format!(
            "- {}: {} new ({} crawled), {}",
            source.source_url,
            source.posts.len(),
            source.crawled,
            source.outcome
        ));
    }

    let highlights: Vec<String> = report
        .all_posts()
        .map(enrich::enrich)
        .filter(|e| e.is_valid())
        .take(SUMMARY_TITLES)
        .map(|e| match e.budget {
            Some(budget) => format!("• {} ({:.0}-{:.0}) {}", e.title, budget.from, budget.to, e.post.url),
            None => format!("• {} {}", e.title, e.post.url),
        })
        .collect();

    if !highlights.is_empty() {
        lines.push(String::new());
        lines.extend(highlights);
    }

    lines.join("\n")
}

/// Deliver the run summary to every configured channel. Never fails the run.
pub async fn send_run_summary(report: &CrawlReport) {
    let msg = format_run_summary(report);
    if let Err(e) = send_notifications(&msg).await {
        warn!(error = %e, "Failed to send run summary");
    }
}

pub async fn send_notifications(msg: &str) -> Result<()> {
    let telegram_token = env::var("TELEGRAM_BOT_TOKEN").ok();
    let telegram_chat = env::var("TELEGRAM_CHAT_ID").ok();
    let slack_webhook = env::var("SLACK_WEBHOOK_URL").ok();
    let discord_webhook = env::var("DISCORD_WEBHOOK_URL").ok();

    let client = Client::new();
    let mut sent = false;

    if let (Some(token), Some(chat_id)) = (telegram_token, telegram_chat) {
        send_telegram(&client, &token, &chat_id, msg).await?;
        sent = true;
    }

    if let Some(webhook) = slack_webhook {
        send_slack(&client, &webhook, msg).await?;
        sent = true;
    }

    if let Some(webhook) = discord_webhook {
        send_discord(&client, &webhook, msg).await?;
        sent = true;
    }

    if !sent {
        info!("No notification channels configured. Summary:\n{}", msg);
    }

    Ok(())
}

async fn send_telegram(client: &Client, token: &str, chat_id: &str, text: &str) -> Result<()> {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
    client
        .post(&url)
        .json(&serde_json::json!({"chat_id": chat_id, "text": text}))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

async fn send_slack(client: &Client, webhook_url: &str, text: &str) -> Result<()> {
    client
        .post(webhook_url)
        .json(&serde_json::json!({"text": text}))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

async fn send_discord(client: &Client, webhook_url: &str, text: &str) -> Result<()> {
    client
        .post(webhook_url)
        .json(&serde_json::json!({"content": text}))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Post, PostId, SourceOutcome, SourceReport, StopReason};
    use chrono::Utc;

    fn make_post(id: &str, title: &str) -> Post {
        Post {
            id: PostId::Source(id.to_string()),
            title: title.to_string(),
            description: format!("{}. Ищем исполнителя, бюджет 5000 - 8000", title),
            work_type: String::new(),
            payment: String::new(),
            deadline: String::new(),
            url: format!("https://t.me/channel/{}", id),
            source_url: "https://t.me/s/channel".to_string(),
            scraped_at: Utc::now(),
            published_at: None,
        }
    }

    #[test]
    fn test_summary_lists_sources_and_titles() {
        let report = CrawlReport {
            sources: vec![
                SourceReport {
                    source_url: "https://t.me/s/channel".to_string(),
                    posts: vec![make_post("1", "💼 Нужен дизайнер")],
                    crawled: 3,
                    outcome: SourceOutcome::Stopped { reason: StopReason::NoGrowth },
                },
                SourceReport {
                    source_url: "https://t.me/s/down".to_string(),
                    posts: Vec::new(),
                    crawled: 0,
                    outcome: SourceOutcome::Failed { reason: "navigation failed".to_string() },
                },
            ],
        };

        let summary = format_run_summary(&report);
        assert!(summary.starts_with("[Job Feeds] 1 new posts from 2 sources"));
        assert!(summary.contains("https://t.me/s/channel: 1 new (3 crawled), StopNoGrowth"));
        assert!(summary.contains("https://t.me/s/down: 0 new (0 crawled), failed: navigation failed"));
        assert!(summary.contains("• Требуется дизайн (5000-8000) https://t.me/channel/1"));
    }
}

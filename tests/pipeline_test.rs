//! Integration tests for the crawl pipeline
//! Drives the orchestrator over captured channel pages replayed by `SnapshotSession`

use chrono::{TimeZone, Utc};
use crawl_job_feeds::config::CrawlConfig;
use crawl_job_feeds::dedup::DedupIndex;
use crawl_job_feeds::extractor::PostExtractor;
use crawl_job_feeds::fields::{extract_field, FieldLabels};
use crawl_job_feeds::orchestrator::{crawl, MultiSourceOrchestrator};
use crawl_job_feeds::session::SnapshotSession;
use crawl_job_feeds::store::{JsonFileStore, MemoryStore, PostStore};
use crawl_job_feeds::{SourceOutcome, StopReason};
use tempfile::TempDir;

const A: &str = "https://t.me/s/freelance_a";
const B: &str = "https://t.me/s/freelance_b";

/// One message block as rendered by the channel preview page.
fn message(channel: &str, id: u32, text: &str, datetime: Option<&str>) -> String {
    let date = datetime
        .map(|d| {
            format!(
                r#"<a class="tgme_widget_message_date" href="https://t.me/{channel}/{id}"><time datetime="{d}">{d}</time></a>"#
            )
        })
        .unwrap_or_default();
    format!(
        r#"<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message" data-post="{channel}/{id}">
    <div class="tgme_widget_message_text">{text}</div>
    <div class="tgme_widget_message_footer">{date}</div>
  </div>
</div>"#
    )
}

fn channel_page(messages: &[String]) -> String {
    format!(
        "<html><body><section class=\"tgme_channel_history\">{}</section></body></html>",
        messages.join("\n")
    )
}

fn job(title: &str) -> String {
    format!("📌 Вакансия: {title}<br>Тип работы: удаленно<br>Оплата: 500")
}

fn test_config(sources: &[&str]) -> CrawlConfig {
    let mut config = CrawlConfig::with_sources(sources.iter().map(|s| s.to_string()).collect());
    config.max_iterations = 5;
    config.scroll_steps = 1;
    config
}

fn sources(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn two_channel_session() -> SnapshotSession {
    let page_a = channel_page(&[
        message("freelance_a", 10, &job("логотип для кофейни"), None),
        message("freelance_a", 11, &job("телеграм бот на Python"), None),
    ]);
    let page_b = channel_page(&[
        message("freelance_b", 300, &job("верстка лендинга"), None),
        message("freelance_b", 301, &job("логотип для кофейни"), None),
    ]);
    SnapshotSession::new()
        .with_page(A, vec![page_a])
        .with_page(B, vec![page_b])
}

#[tokio::test]
async fn test_second_run_accepts_nothing_new() {
    let mut store = MemoryStore::new();

    let mut first = MultiSourceOrchestrator::new(two_channel_session(), test_config(&[A, B]))
        .with_dedup(DedupIndex::from_store(&store).unwrap());
    let report = first.run_configured().await.unwrap();
    assert_eq!(report.total_accepted(), 3);
    for source in &report.sources {
        store.append(&source.posts).unwrap();
    }

    let mut second = MultiSourceOrchestrator::new(two_channel_session(), test_config(&[A, B]))
        .with_dedup(DedupIndex::from_store(&store).unwrap());
    let report = second.run_configured().await.unwrap();
    assert_eq!(report.total_accepted(), 0);
    assert_eq!(store.posts().len(), 3);
}

#[tokio::test]
async fn test_second_run_against_json_files_accepts_nothing_new() {
    let dir = TempDir::new().unwrap();
    let mut store = JsonFileStore::open(dir.path()).unwrap();

    for expected in [3, 0] {
        let dedup = DedupIndex::from_store(&store).unwrap();
        let mut orchestrator =
            MultiSourceOrchestrator::new(two_channel_session(), test_config(&[A, B])).with_dedup(dedup);
        let report = orchestrator.run_configured().await.unwrap();
        assert_eq!(report.total_accepted(), expected);
        for source in &report.sources {
            store.append(&source.posts).unwrap();
        }
    }

    assert_eq!(store.load_all().unwrap().len(), 3);
}

#[tokio::test]
async fn test_same_content_different_ids_yields_once() {
    let page = channel_page(&[
        message("freelance_a", 20, &job("монтаж видео"), None),
        message("freelance_a", 21, &job("МОНТАЖ ВИДЕО"), None),
        message("freelance_a", 22, &job("монтаж видео"), None),
    ]);
    let mut session = SnapshotSession::new().with_page(A, vec![page]);

    let report = crawl(&mut session, &test_config(&[A]), &sources(&[A]), None)
        .await
        .unwrap();

    let ids: Vec<&str> = report.all_posts().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["20"]);
    assert_eq!(report.sources[0].crawled, 3);
}

#[tokio::test]
async fn test_raising_cutoff_never_returns_more_posts() {
    let newest = channel_page(&[
        message("freelance_a", 6, &job("пост шесть"), Some("2024-01-20T10:00:00+00:00")),
        message("freelance_a", 5, &job("пост пять"), Some("2024-01-19T10:00:00+00:00")),
        message("freelance_a", 4, &job("пост четыре"), Some("2024-01-18T10:00:00+00:00")),
    ]);
    let older = channel_page(&[
        message("freelance_a", 3, &job("пост три"), Some("2024-01-17T10:00:00+00:00")),
        message("freelance_a", 2, &job("пост два"), Some("2024-01-16T10:00:00+00:00")),
        message("freelance_a", 1, &job("пост один"), Some("2024-01-15T10:00:00+00:00")),
    ]);
    let mut session = SnapshotSession::new().with_page(A, vec![newest, older]);
    let config = test_config(&[A]);

    let mut previous = usize::MAX;
    for day in 10..=22 {
        let cutoff = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        let report = crawl(&mut session, &config, &sources(&[A]), Some(cutoff))
            .await
            .unwrap();
        let count = report.total_accepted();
        assert!(count <= previous, "cutoff {} returned {} > {}", cutoff, count, previous);
        previous = count;
    }

    let all = crawl(&mut session, &config, &sources(&[A]), None).await.unwrap();
    assert_eq!(all.total_accepted(), 6);
    assert_eq!(previous, 0);
}

#[test]
fn test_classifier_requires_keyword_and_glyph_and_no_ad() {
    let page = channel_page(&[
        message("freelance_a", 1, "Вакансия: нужен разработчик, оплата 500", None),
        message("freelance_a", 2, "Реклама 📌 вакансия мечты, работа и зарплата", None),
        message("freelance_a", 3, "📌 Отличная погода сегодня на канале", None),
        message("freelance_a", 4, "📌 Вакансия: нужен разработчик, оплата 500", None),
    ]);

    let posts = PostExtractor::default().extract(&page, A, Utc::now());

    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["4"]);
}

#[tokio::test]
async fn test_shared_post_attributed_to_first_source() {
    let shared = job("дизайн визиток");
    let page_a = channel_page(&[
        message("freelance_a", 40, &job("копирайтинг"), None),
        message("freelance_a", 41, &shared, None),
    ]);
    // the shared post comes first on B's page
    let page_b = channel_page(&[
        message("freelance_b", 900, &shared, None),
        message("freelance_b", 901, &job("настройка рекламы"), None),
    ]);
    let session = SnapshotSession::new()
        .with_page(A, vec![page_a])
        .with_page(B, vec![page_b]);
    let mut orchestrator = MultiSourceOrchestrator::new(session, test_config(&[A, B]));

    let report = orchestrator.run_configured().await.unwrap();
    let by_source = report.posts_by_source();

    let a_ids: Vec<&str> = by_source[A].iter().map(|p| p.id.as_str()).collect();
    let b_ids: Vec<&str> = by_source[B].iter().map(|p| p.id.as_str()).collect();
    assert_eq!(a_ids, vec!["40", "41"]);
    assert_eq!(b_ids, vec!["901"]);
    assert_eq!(report.sources[0].source_url, A);
    assert_eq!(report.sources[1].source_url, B);
}

#[tokio::test]
async fn test_rerendered_page_stops_with_no_growth() {
    let page = channel_page(&[
        message("digitaltender", 499, &job("таргетолог"), None),
        message("digitaltender", 500, &job("SMM менеджер"), None),
        message("digitaltender", 501, &job("разработчик"), None),
    ]);
    let source = "https://t.me/s/digitaltender";
    let mut session = SnapshotSession::new().with_page(source, vec![page.clone(), page]);

    let report = crawl(&mut session, &test_config(&[source]), &sources(&[source]), None)
        .await
        .unwrap();

    let outcomes = report.outcome_by_source();
    assert_eq!(outcomes[source].stop_reason(), Some(StopReason::NoGrowth));
    let by_source = report.posts_by_source();
    let posts = by_source[source];
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[2].id.as_str(), "501");
}

#[tokio::test]
async fn test_cutoff_excludes_older_posts_and_stops() {
    let page = channel_page(&[
        message("freelance_a", 3, &job("первая"), Some("2024-01-12T09:00:00+00:00")),
        message("freelance_a", 2, &job("вторая"), Some("2024-01-11T09:00:00+00:00")),
        message("freelance_a", 1, &job("третья"), Some("2024-01-09T09:00:00+00:00")),
    ]);
    let mut session = SnapshotSession::new().with_page(A, vec![page]);
    let cutoff = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();

    let report = crawl(&mut session, &test_config(&[A]), &sources(&[A]), Some(cutoff))
        .await
        .unwrap();

    assert_eq!(
        report.sources[0].outcome,
        SourceOutcome::Stopped { reason: StopReason::Cutoff }
    );
    let ids: Vec<&str> = report.all_posts().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "2"]);
}

#[test]
fn test_payment_label_on_same_line() {
    let text = "📌 Вакансия: нужен разработчик. Оплата: 500";
    assert_eq!(extract_field(text, &["оплата"]), "500");
    assert_eq!(extract_field(text, FieldLabels::PAYMENT), "500");
}

#[tokio::test]
async fn test_unreachable_source_is_reported_and_run_continues() {
    let session = two_channel_session().with_failure(A, "net::ERR_NAME_NOT_RESOLVED");
    let mut orchestrator = MultiSourceOrchestrator::new(session, test_config(&[A, B]));

    let report = orchestrator.run_configured().await.unwrap();

    assert!(matches!(report.sources[0].outcome, SourceOutcome::Failed { .. }));
    assert!(report.sources[0].posts.is_empty());
    assert_eq!(report.sources[1].posts.len(), 2);
}

#[tokio::test]
async fn test_reply_post_reads_its_own_body() {
    let original = message("freelance_a", 600, &job("старый пост"), None);
    let reply = r#"<div class="tgme_widget_message_wrap">
  <div class="tgme_widget_message" data-post="freelance_a/610">
    <a class="tgme_widget_message_reply" href="https://t.me/freelance_a/600">
      <div class="tgme_widget_message_text js-message_reply_text">📌 Вакансия: старый пост<br>Тип работы: удаленно<br>Оплата: 500</div>
    </a>
    <div class="tgme_widget_message_text">💼 Вакансия: новый дизайнер<br>Оплата: 900</div>
  </div>
</div>"#
        .to_string();
    let mut session = SnapshotSession::new().with_page(A, vec![channel_page(&[original, reply])]);

    let report = crawl(&mut session, &test_config(&[A]), &sources(&[A]), None)
        .await
        .unwrap();

    let posts: Vec<_> = report.all_posts().collect();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].id.as_str(), "610");
    assert!(posts[1].title.contains("новый дизайнер"));
    assert_eq!(posts[1].payment, "900");
}

#[tokio::test]
async fn test_source_listed_twice_is_a_configuration_error() {
    let mut orchestrator = MultiSourceOrchestrator::new(two_channel_session(), test_config(&[A, B, A]));

    let err = orchestrator.run_configured().await.unwrap_err();

    assert!(matches!(err, crawl_job_feeds::CrawlError::Configuration(_)));
    assert_eq!(orchestrator.session().scroll_count(), 0);
}

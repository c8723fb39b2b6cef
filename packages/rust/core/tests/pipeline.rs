//! End-to-end runs against mock feeds and article pages.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use briefwire_core::{
    PipelineOptions, SilentProgress, run_content_batch, run_enrichment_batch, run_ingest,
    run_pipeline,
};
use briefwire_shared::{
    Cadence, ContentFetchStatus, ContentOptions, EnrichOptions, FeedSource, IngestOptions,
    QualityTier, SourceCategory, SourceRegistry, StoryRole,
};
use briefwire_storage::Storage;

fn source(id: &str, server: &MockServer, feed_path: &str) -> FeedSource {
    FeedSource {
        id: id.into(),
        name: format!("Mock {id}"),
        category: SourceCategory::Journalism,
        feed_url: format!("{}{feed_path}", server.uri()),
        homepage_url: server.uri(),
        weight: 1.5,
        quality_tier: QualityTier::Primary,
        cadence: Cadence::Daily,
        story_role: StoryRole::News,
    }
}

fn hours_ago(hours: i64) -> String {
    (Utc::now() - chrono::Duration::hours(hours)).to_rfc2822()
}

fn feed_body(base: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Mock Defense</title>
<item>
  <title>Pentagon advances Golden Dome interceptor plan</title>
  <link>{base}/articles/golden-dome#comments</link>
  <description>&lt;p&gt;The missile defense effort moves ahead.&lt;/p&gt;</description>
  <pubDate>{d1}</pubDate>
</item>
<item>
  <title>Navy frigate program slips again</title>
  <link>{base}/articles/thin?utm_source=rss&amp;utm_medium=feed</link>
  <description>Shipbuilding delays continue.</description>
  <pubDate>{d2}</pubDate>
</item>
<item>
  <title>Army artillery contract awarded</title>
  <link>{base}/articles/missing</link>
  <description>A howitzer deal.</description>
  <pubDate>{d3}</pubDate>
</item>
<item>
  <title>Old budget story</title>
  <link>{base}/articles/stale</link>
  <pubDate>{stale}</pubDate>
</item>
</channel></rss>"#,
        d1 = hours_ago(1),
        d2 = hours_ago(2),
        d3 = hours_ago(3),
        stale = hours_ago(200),
    )
}

fn article_page() -> String {
    let filler = "Officials described the architecture, the sensors, and the interceptors in detail. "
        .repeat(15);
    format!(
        r#"<html><head><meta property="og:image" content="/img/dome.jpg"></head>
        <body><nav>Home | Air | Land | Sea</nav>
        <article><h1>Golden Dome</h1>
        <p>The Pentagon said the Golden Dome missile defense program will add space-based interceptors, with testing planned, funding requested, and contracts expected.</p>
        <p>{filler}</p>
        </article><footer>Copyright</footer></body></html>"#
    )
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(feed_body(&server.uri())),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/golden-dome"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(article_page()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/thin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body><p>Subscribe to read this story.</p></body></html>"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

async fn temp_storage() -> Arc<Storage> {
    let path = std::env::temp_dir().join(format!("bw_e2e_{}.db", Uuid::now_v7()));
    Arc::new(Storage::open(&path).await.expect("open test db"))
}

fn ingest_options(max_per_source: usize) -> IngestOptions {
    IngestOptions {
        max_per_source,
        limit: 50,
        since_hours: 72,
        timeout: Duration::from_secs(5),
        source_ids: Vec::new(),
    }
}

#[tokio::test]
async fn ingest_isolates_failures_and_is_idempotent() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let registry = SourceRegistry::new(vec![
        source("mock-defense", &server, "/feed.xml"),
        source("broken", &server, "/broken.xml"),
    ])
    .unwrap();
    let storage = temp_storage().await;

    let report = run_ingest(&ingest_options(10), &registry, &storage, &SilentProgress)
        .await
        .unwrap();
    assert_eq!(report.sources_attempted, 2);
    assert_eq!(report.sources_ok, 1);
    assert_eq!(report.source_errors.len(), 1);
    assert_eq!(report.source_errors[0].item_id, "broken");
    assert_eq!(report.items_fetched, 4);
    assert_eq!(report.items_ranked, 3);
    assert_eq!(report.articles_written, 3);
    assert!(!report.used_legacy_fallback);

    let stored = storage
        .get_article_by_url(&format!("{}/articles/thin", server.uri()))
        .await
        .unwrap()
        .expect("canonical URL stored");
    assert_eq!(stored.content_fetch_status, ContentFetchStatus::Pending);
    assert!(stored.tags.domains.contains(&"maritime".to_string()));

    let stats = storage.ingest_run_stats(&report.run_id).await.unwrap().unwrap();
    assert!(stats.contains("\"articles_written\":3"));

    run_ingest(&ingest_options(10), &registry, &storage, &SilentProgress)
        .await
        .unwrap();
    assert_eq!(storage.count_articles().await.unwrap(), 3);
}

#[tokio::test]
async fn per_source_cap_limits_articles() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let registry =
        SourceRegistry::new(vec![source("mock-defense", &server, "/feed.xml")]).unwrap();
    let storage = temp_storage().await;

    let report = run_ingest(&ingest_options(2), &registry, &storage, &SilentProgress)
        .await
        .unwrap();
    assert_eq!(report.items_fetched, 2);
    assert_eq!(storage.count_articles().await.unwrap(), 2);
}

#[tokio::test]
async fn content_and_enrichment_batches() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let registry = Arc::new(
        SourceRegistry::new(vec![source("mock-defense", &server, "/feed.xml")]).unwrap(),
    );
    let storage = temp_storage().await;
    run_ingest(&ingest_options(10), &registry, &storage, &SilentProgress)
        .await
        .unwrap();

    let content_options = ContentOptions {
        concurrency: 2,
        batch_size: 10,
        timeout: Duration::from_secs(5),
        user_agent: None,
    };
    let content = run_content_batch(Arc::clone(&storage), &content_options, &SilentProgress)
        .await
        .unwrap();
    assert_eq!(content.processed, 3);
    assert_eq!(content.succeeded, 1);
    assert_eq!(content.failed, 2);
    assert!(
        content
            .errors
            .iter()
            .any(|e| e.message.contains("no usable article body found"))
    );

    let dome_url = format!("{}/articles/golden-dome", server.uri());
    let dome = storage.get_article_by_url(&dome_url).await.unwrap().unwrap();
    assert_eq!(dome.content_fetch_status, ContentFetchStatus::Fetched);

    // Nothing left to extract.
    let again = run_content_batch(Arc::clone(&storage), &content_options, &SilentProgress)
        .await
        .unwrap();
    assert_eq!(again.processed, 0);

    let enrich_options = EnrichOptions {
        concurrency: 3,
        batch_size: 10,
        refresh: false,
    };
    let enriched = run_enrichment_batch(
        Arc::clone(&storage),
        Arc::clone(&registry),
        &enrich_options,
        &SilentProgress,
    )
    .await
    .unwrap();
    assert_eq!(enriched.processed, 3);
    assert_eq!(enriched.succeeded, 3);
    assert!(!enriched.used_legacy_fallback);

    let topics = storage.topics_for_article(&dome.id).await.unwrap();
    let slugs: Vec<_> = topics.iter().map(|t| t.topic.slug.as_str()).collect();
    assert!(slugs.contains(&"golden-dome"));
    assert!(slugs.contains(&"department-of-defense"));
    assert_eq!(slugs.iter().filter(|s| **s == "golden-dome").count(), 1);

    let tagged = storage.get_article_by_url(&dome_url).await.unwrap().unwrap();
    assert!(tagged.tags.missions.contains(&"missile-defense".to_string()));

    let idle = run_enrichment_batch(
        Arc::clone(&storage),
        Arc::clone(&registry),
        &enrich_options,
        &SilentProgress,
    )
    .await
    .unwrap();
    assert_eq!(idle.processed, 0);

    let refreshed = run_enrichment_batch(
        Arc::clone(&storage),
        Arc::clone(&registry),
        &EnrichOptions {
            refresh: true,
            ..enrich_options
        },
        &SilentProgress,
    )
    .await
    .unwrap();
    assert_eq!(refreshed.processed, 3);
    assert_eq!(storage.topics_for_article(&dome.id).await.unwrap().len(), topics.len());
}

#[tokio::test]
async fn full_pipeline_run() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let registry = Arc::new(
        SourceRegistry::new(vec![source("mock-defense", &server, "/feed.xml")]).unwrap(),
    );
    let storage = temp_storage().await;

    let options = PipelineOptions {
        ingest: ingest_options(10),
        ..Default::default()
    };
    let report = run_pipeline(&options, registry, Arc::clone(&storage), &SilentProgress)
        .await
        .unwrap();
    assert_eq!(report.ingest.articles_written, 3);
    assert_eq!(report.content.processed, 3);
    assert_eq!(report.enrichment.processed, 3);
    assert!(storage.count_topics().await.unwrap() >= 2);
}

/// Remove the tag columns from a migrated database, leaving the legacy row shape.
async fn strip_tag_columns(path: &std::path::Path) {
    let db = libsql::Builder::new_local(path).build().await.unwrap();
    let conn = db.connect().unwrap();
    conn.execute_batch(
        "DROP INDEX IF EXISTS idx_articles_track;
         ALTER TABLE articles DROP COLUMN mission_tags;
         ALTER TABLE articles DROP COLUMN domain_tags;
         ALTER TABLE articles DROP COLUMN technology_tags;
         ALTER TABLE articles DROP COLUMN track;
         ALTER TABLE articles DROP COLUMN content_type;
         ALTER TABLE articles DROP COLUMN high_impact;",
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn enrichment_reports_legacy_fallback() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let registry = Arc::new(
        SourceRegistry::new(vec![source("mock-defense", &server, "/feed.xml")]).unwrap(),
    );

    let path = std::env::temp_dir().join(format!("bw_legacy_{}.db", Uuid::now_v7()));
    drop(Storage::open(&path).await.unwrap());
    strip_tag_columns(&path).await;
    let storage = Arc::new(Storage::open(&path).await.unwrap());

    let report = run_ingest(&ingest_options(10), &registry, &storage, &SilentProgress)
        .await
        .unwrap();
    assert_eq!(report.articles_written, 3);
    assert!(report.used_legacy_fallback);

    let enriched = run_enrichment_batch(
        Arc::clone(&storage),
        Arc::clone(&registry),
        &EnrichOptions {
            concurrency: 2,
            batch_size: 10,
            refresh: false,
        },
        &SilentProgress,
    )
    .await
    .unwrap();
    assert_eq!(enriched.processed, 3);
    assert_eq!(enriched.succeeded, 3);
    assert!(enriched.used_legacy_fallback);
    assert!(storage.count_topics().await.unwrap() >= 1);
}

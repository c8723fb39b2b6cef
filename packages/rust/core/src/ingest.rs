//! Ingest stage: fetch feeds, rank, and persist sources and articles.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use briefwire_feeds::{FeedFetcher, RankOptions, rank_items};
use briefwire_shared::{
    BriefwireError, ContentFetchStatus, IngestOptions, ItemError, PersistedArticle, PulledItem,
    Result, SourceRegistry,
};
use briefwire_storage::Storage;
use briefwire_tagging::{ArticleText, classify};

use crate::pipeline::ProgressReporter;

/// Summary of one ingest run, also stored as the run's stats JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub run_id: String,
    pub sources_attempted: usize,
    pub sources_ok: usize,
    /// One entry per source whose fetch or parse failed.
    pub source_errors: Vec<ItemError>,
    pub items_fetched: usize,
    /// Items left after dedup, recency filter, and the overall limit.
    pub items_ranked: usize,
    pub articles_written: usize,
    pub used_legacy_fallback: bool,
    pub duration_ms: u64,
}

/// Fetch every selected source, rank the pooled items, and upsert the
/// survivors with an initial title/summary classification.
#[instrument(skip_all, fields(sources = registry.len(), limit = options.limit))]
pub async fn run_ingest(
    options: &IngestOptions,
    registry: &SourceRegistry,
    storage: &Storage,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let start = Instant::now();
    let sources = registry.select(&options.source_ids)?;
    if sources.is_empty() {
        return Err(BriefwireError::validation("no sources selected"));
    }

    let run_id = storage.insert_ingest_run().await?;
    let mut report = IngestReport {
        run_id: run_id.clone(),
        sources_attempted: sources.len(),
        ..Default::default()
    };

    progress.phase("Registering sources");
    storage.upsert_sources(&sources).await?;

    progress.phase("Fetching feeds");
    let fetcher = FeedFetcher::new(options.timeout)?;
    let fetched = fetcher.fetch_all(&sources, options.max_per_source).await;
    report.sources_ok = fetched.sources_ok;
    report.items_fetched = fetched.items.len();
    report.source_errors = fetched
        .errors
        .into_iter()
        .map(|e| ItemError {
            item_id: e.source_id,
            message: e.message,
        })
        .collect();

    progress.phase("Ranking items");
    let now = Utc::now();
    let ranked = rank_items(
        fetched.items,
        registry,
        &RankOptions {
            since_hours: options.since_hours,
            limit: options.limit,
            now,
        },
    );
    report.items_ranked = ranked.len();

    progress.phase("Saving articles");
    let articles: Vec<PersistedArticle> = ranked
        .into_iter()
        .map(|r| to_article(r.item, registry, now))
        .collect();

    match storage.upsert_articles(&articles).await {
        Ok(outcome) => {
            report.articles_written = outcome.written;
            report.used_legacy_fallback = outcome.used_legacy_fallback;
        }
        Err(e) => {
            let stats = serde_json::json!({ "error": e.to_string() }).to_string();
            if let Err(finish) = storage.finish_ingest_run(&run_id, &stats).await {
                warn!(error = %finish, "failed to record ingest failure");
            }
            return Err(e);
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    let stats = serde_json::to_string(&report)
        .map_err(|e| BriefwireError::Storage(format!("failed to encode run stats: {e}")))?;
    storage.finish_ingest_run(&run_id, &stats).await?;

    info!(
        run_id = %report.run_id,
        sources_ok = report.sources_ok,
        source_errors = report.source_errors.len(),
        fetched = report.items_fetched,
        written = report.articles_written,
        legacy = report.used_legacy_fallback,
        duration_ms = report.duration_ms,
        "ingest completed"
    );
    progress.done(&format!(
        "Ingested {} articles from {}/{} sources",
        report.articles_written, report.sources_ok, report.sources_attempted
    ));
    Ok(report)
}

/// A new article row for `item`, classified on title and summary only.
pub fn to_article(
    item: PulledItem,
    registry: &SourceRegistry,
    fetched_at: DateTime<Utc>,
) -> PersistedArticle {
    let tags = classify(&ArticleText {
        title: &item.title,
        summary: &item.summary,
        url: &item.url,
        full_text: None,
        source: registry.get(&item.source_id),
    });

    PersistedArticle {
        id: Uuid::now_v7().to_string(),
        url: item.url,
        source_id: item.source_id,
        title: item.title,
        summary: item.summary,
        author: item.author,
        guid: item.guid,
        tags,
        published_at: item.published_at,
        fetched_at,
        content_fetch_status: ContentFetchStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefwire_shared::{ContentType, Track};

    #[test]
    fn to_article_classifies_from_feed_fields() {
        let registry = SourceRegistry::builtin();
        let item = PulledItem {
            source_id: "defense-news".into(),
            title: "Startup raises $40 million for drone swarms".into(),
            url: "https://www.defensenews.com/industry/2026/01/15/startup".into(),
            summary: "The venture round funds autonomous aircraft.".into(),
            published_at: None,
            author: Some("Staff".into()),
            guid: None,
        };

        let article = to_article(item, &registry, Utc::now());
        assert_eq!(article.content_fetch_status, ContentFetchStatus::Pending);
        assert_eq!(article.tags.content_type, ContentType::Funding);
        assert_eq!(article.tags.track, Track::Capital);
        assert!(article.tags.technologies.contains(&"autonomy".to_string()));
        assert_eq!(article.author.as_deref(), Some("Staff"));
        assert!(!article.id.is_empty());
    }
}

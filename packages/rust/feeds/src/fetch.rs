//! Concurrent feed fetcher with per-source failure isolation.

use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, info, instrument, warn};

use briefwire_shared::{BriefwireError, FeedSource, PulledItem, Result};

use crate::parse::parse_feed;

/// User-Agent string for feed requests.
pub const USER_AGENT: &str = concat!("Briefwire/", env!("CARGO_PKG_VERSION"));

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5";

// ---------------------------------------------------------------------------
// FetchReport
// ---------------------------------------------------------------------------

/// A source that contributed no items because its fetch or parse failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFetchError {
    pub source_id: String,
    pub source_name: String,
    pub message: String,
}

/// Outcome of fetching a set of feeds.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Items from every successful source, each source already capped.
    pub items: Vec<PulledItem>,
    pub errors: Vec<SourceFetchError>,
    /// Number of sources that fetched and parsed cleanly.
    pub sources_ok: usize,
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// FeedFetcher
// ---------------------------------------------------------------------------

/// Fetches RSS/Atom feeds, one task per source.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    timeout: Duration,
}

impl FeedFetcher {
    /// Create a fetcher whose requests each time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| BriefwireError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// Fetch every source concurrently. A failing source is recorded in
    /// [`FetchReport::errors`] and never affects the others.
    #[instrument(skip_all, fields(sources = sources.len(), max_per_source))]
    pub async fn fetch_all(&self, sources: &[FeedSource], max_per_source: usize) -> FetchReport {
        let start = Instant::now();
        let mut handles = Vec::with_capacity(sources.len());

        for source in sources {
            let fetcher = self.clone();
            let source = source.clone();
            handles.push(tokio::spawn(async move {
                let result = fetcher.fetch_source(&source, max_per_source).await;
                (source, result)
            }));
        }

        let mut report = FetchReport::default();
        for handle in handles {
            match handle.await {
                Ok((_, Ok(items))) => {
                    report.sources_ok += 1;
                    report.items.extend(items);
                }
                Ok((source, Err(e))) => {
                    warn!(source = %source.id, error = %e, "feed fetch failed");
                    report.errors.push(SourceFetchError {
                        source_id: source.id,
                        source_name: source.name,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "feed task panicked");
                    report.errors.push(SourceFetchError {
                        source_id: "task".into(),
                        source_name: "task".into(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.duration = start.elapsed();
        info!(
            items = report.items.len(),
            sources_ok = report.sources_ok,
            errors = report.errors.len(),
            duration_ms = report.duration.as_millis(),
            "feed fetch completed"
        );
        report
    }

    /// Fetch and parse one source, newest first, capped at `max_per_source`.
    pub async fn fetch_source(
        &self,
        source: &FeedSource,
        max_per_source: usize,
    ) -> Result<Vec<PulledItem>> {
        let body = tokio::time::timeout(self.timeout, self.fetch_body(source))
            .await
            .map_err(|_| {
                BriefwireError::Network(format!(
                    "{}: timed out after {}s",
                    source.feed_url,
                    self.timeout.as_secs()
                ))
            })??;

        let mut items = parse_feed(&body, source)?;
        sort_newest_first(&mut items);
        items.truncate(max_per_source);

        debug!(source = %source.id, items = items.len(), "source fetched");
        Ok(items)
    }

    async fn fetch_body(&self, source: &FeedSource) -> Result<String> {
        let url = &source.feed_url;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, FEED_ACCEPT)
            .send()
            .await
            .map_err(|e| BriefwireError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BriefwireError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| BriefwireError::Network(format!("{url}: body read failed: {e}")))
    }
}

/// Published-desc with undated items last.
fn sort_newest_first(items: &mut [PulledItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

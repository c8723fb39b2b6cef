//! Article content extraction.
//!
//! Fetches an article page and returns its main text, excerpt, lead image,
//! and reading metrics. Extraction never returns an error: transport
//! failures, timeouts, non-HTML responses, and pages without a usable body
//! all come back as an [`ExtractedContent`] with status `failed`.

pub mod image;
pub mod metrics;
pub mod readability;

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use scraper::Html;
use tracing::{debug, instrument, warn};
use url::Url;

use briefwire_shared::{BriefwireError, ExtractedContent, ExtractionStatus, Result};

pub use image::lead_image;
pub use metrics::{compute_hash, excerpt, reading_minutes, word_count};
pub use readability::{BodySource, BodyText, extract_body};

/// Default User-Agent for article requests.
pub const USER_AGENT: &str = concat!("Briefwire/", env!("CARGO_PKG_VERSION"));

/// Pages with fewer words than this are reported as failed.
pub const MIN_USABLE_WORDS: usize = 40;

pub const NO_BODY_MESSAGE: &str = "no usable article body found";

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Fetches article pages and extracts their content.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    client: Client,
    timeout: Duration,
}

impl ContentExtractor {
    /// Create an extractor. `user_agent` overrides the default Briefwire agent.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| BriefwireError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// Fetch `url` and extract its content.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &str) -> ExtractedContent {
        let fetched = tokio::time::timeout(self.timeout, self.fetch_html(url)).await;
        let (body, final_url) = match fetched {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                warn!(error = %e, "content fetch failed");
                return ExtractedContent::failed(e.to_string());
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "content fetch timed out");
                return ExtractedContent::failed(format!(
                    "{url}: timed out after {}s",
                    self.timeout.as_secs()
                ));
            }
        };

        let content = extract_from_html(&body, &final_url);
        debug!(
            status = content.status.as_str(),
            words = content.word_count.unwrap_or(0),
            "content extracted"
        );
        content
    }

    async fn fetch_html(&self, url: &str) -> Result<(String, Url)> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HTML_ACCEPT)
            .send()
            .await
            .map_err(|e| BriefwireError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BriefwireError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_markup(&content_type) {
            return Err(BriefwireError::Extraction(format!(
                "{url}: unsupported content-type '{content_type}'"
            )));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| BriefwireError::Network(format!("{url}: failed to read body: {e}")))?;
        Ok((body, final_url))
    }
}

/// HTML and XML-like content types. A missing header is accepted.
fn is_markup(content_type: &str) -> bool {
    content_type.is_empty() || content_type.contains("html") || content_type.contains("xml")
}

/// Extract content from an already-fetched page.
pub fn extract_from_html(html: &str, page_url: &Url) -> ExtractedContent {
    let doc = Html::parse_document(html);
    let body = extract_body(&doc);
    let words = body.word_count();
    if words < MIN_USABLE_WORDS {
        return ExtractedContent::failed(NO_BODY_MESSAGE);
    }

    ExtractedContent {
        excerpt: Some(excerpt(&body.text, metrics::EXCERPT_MAX_CHARS)),
        lead_image_url: lead_image(&doc, page_url),
        word_count: Some(words),
        reading_minutes: Some(reading_minutes(words)),
        content_hash: Some(compute_hash(&body.text)),
        full_text: Some(body.text),
        status: ExtractionStatus::Fetched,
        error: None,
        fetched_at: Utc::now(),
    }
}

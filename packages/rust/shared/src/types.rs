//! Core domain types shared by every Briefwire crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BriefwireError;

/// Maximum number of per-item error records kept on a batch result.
pub const MAX_ERROR_SAMPLES: usize = 20;

// ---------------------------------------------------------------------------
// Feed sources
// ---------------------------------------------------------------------------

/// Editorial category of a feed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Journalism,
    Official,
    Analysis,
}

/// How much editorial trust a source carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Primary,
    Secondary,
    Supplemental,
}

/// Expected publishing rhythm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Breaking,
    Daily,
    Weekly,
}

/// The part a source's items usually play in a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryRole {
    News,
    Guidance,
    Analysis,
}

/// A feed in the source catalog. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Stable identifier (e.g. `breaking-defense`).
    pub id: String,
    /// Display name.
    pub name: String,
    pub category: SourceCategory,
    /// RSS or Atom feed URL.
    pub feed_url: String,
    /// Public homepage, also used to resolve relative feed links.
    pub homepage_url: String,
    /// Ranking influence; higher weight dominates recency.
    pub weight: f64,
    pub quality_tier: QualityTier,
    pub cadence: Cadence,
    pub story_role: StoryRole,
}

impl FeedSource {
    /// Whether this source publishes official guidance (releases, memos).
    pub fn is_official_guidance(&self) -> bool {
        self.category == SourceCategory::Official || self.story_role == StoryRole::Guidance
    }
}

// ---------------------------------------------------------------------------
// Pulled items
// ---------------------------------------------------------------------------

/// A normalized feed entry. Produced by the fetcher, consumed by the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulledItem {
    pub source_id: String,
    pub title: String,
    /// Canonical URL (fragment and tracking parameters removed).
    pub url: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Coarse content bucket resolved by the keyword classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Conflict,
    Budget,
    Policy,
    Funding,
    Tech,
    Program,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conflict => "conflict",
            Self::Budget => "budget",
            Self::Policy => "policy",
            Self::Funding => "funding",
            Self::Tech => "tech",
            Self::Program => "program",
        }
    }

    /// The editorial track this content type feeds.
    pub fn track(&self) -> Track {
        match self {
            Self::Funding => Track::Capital,
            Self::Budget | Self::Policy | Self::Conflict => Track::Macro,
            Self::Tech => Track::Tech,
            Self::Program => Track::Programs,
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = BriefwireError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "conflict" => Ok(Self::Conflict),
            "budget" => Ok(Self::Budget),
            "policy" => Ok(Self::Policy),
            "funding" => Ok(Self::Funding),
            "tech" => Ok(Self::Tech),
            "program" => Ok(Self::Program),
            other => Err(BriefwireError::validation(format!(
                "unknown content type '{other}'"
            ))),
        }
    }
}

/// Editorial track an article is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Capital,
    Macro,
    Tech,
    Programs,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capital => "capital",
            Self::Macro => "macro",
            Self::Tech => "tech",
            Self::Programs => "programs",
        }
    }
}

impl std::str::FromStr for Track {
    type Err = BriefwireError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "capital" => Ok(Self::Capital),
            "macro" => Ok(Self::Macro),
            "tech" => Ok(Self::Tech),
            "programs" => Ok(Self::Programs),
            other => Err(BriefwireError::validation(format!("unknown track '{other}'"))),
        }
    }
}

/// Output of the keyword classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleTags {
    pub missions: Vec<String>,
    pub domains: Vec<String>,
    pub technologies: Vec<String>,
    pub content_type: ContentType,
    pub track: Track,
    pub high_impact: bool,
}

impl Default for ArticleTags {
    fn default() -> Self {
        Self {
            missions: Vec::new(),
            domains: Vec::new(),
            technologies: Vec::new(),
            content_type: ContentType::Program,
            track: Track::Programs,
            high_impact: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted articles
// ---------------------------------------------------------------------------

/// Where an article is in the content-extraction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFetchStatus {
    Pending,
    Fetched,
    Failed,
}

impl ContentFetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ContentFetchStatus {
    type Err = BriefwireError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "fetched" => Ok(Self::Fetched),
            "failed" => Ok(Self::Failed),
            other => Err(BriefwireError::validation(format!(
                "unknown content status '{other}'"
            ))),
        }
    }
}

/// An article row, keyed by canonical URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedArticle {
    /// Row identifier (UUID v7), stable across upserts of the same URL.
    pub id: String,
    /// Canonical URL; the unique upsert key.
    pub url: String,
    pub source_id: String,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub tags: ArticleTags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub content_fetch_status: ContentFetchStatus,
}

// ---------------------------------------------------------------------------
// Extracted content
// ---------------------------------------------------------------------------

/// Outcome of one content extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Fetched,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Failed => "failed",
        }
    }
}

/// Clean article body and metrics. One-to-one with [`PersistedArticle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub full_text: Option<String>,
    pub excerpt: Option<String>,
    pub lead_image_url: Option<String>,
    pub word_count: Option<usize>,
    pub reading_minutes: Option<u32>,
    /// SHA-256 of `full_text`.
    pub content_hash: Option<String>,
    pub status: ExtractionStatus,
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ExtractedContent {
    /// A failed extraction with every content field empty.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            full_text: None,
            excerpt: None,
            lead_image_url: None,
            word_count: None,
            reading_minutes: None,
            content_hash: None,
            status: ExtractionStatus::Failed,
            error: Some(message.into()),
            fetched_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Kind of entity a taxonomy topic names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicType {
    Organization,
    Program,
    Technology,
    Platform,
    Region,
    Person,
    Concept,
}

impl TopicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Program => "program",
            Self::Technology => "technology",
            Self::Platform => "platform",
            Self::Region => "region",
            Self::Person => "person",
            Self::Concept => "concept",
        }
    }
}

impl std::str::FromStr for TopicType {
    type Err = BriefwireError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "organization" => Ok(Self::Organization),
            "program" => Ok(Self::Program),
            "technology" => Ok(Self::Technology),
            "platform" => Ok(Self::Platform),
            "region" => Ok(Self::Region),
            "person" => Ok(Self::Person),
            "concept" => Ok(Self::Concept),
            other => Err(BriefwireError::validation(format!(
                "unknown topic type '{other}'"
            ))),
        }
    }
}

/// How a topic candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    /// A plain taxonomy alias.
    Alias,
    /// A context-gated alias, admitted because defense context was present.
    ContextAlias,
    /// A capitalized phrase outside the taxonomy. Never persisted.
    Phrase,
}

/// A per-article topic match, before persistence filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCandidate {
    pub slug: String,
    pub label: String,
    pub topic_type: TopicType,
    pub occurrences: u32,
    pub confidence: f64,
    pub is_primary: bool,
    pub matched_by: MatchedBy,
}

/// A canonical topic row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub slug: String,
    pub label: String,
    pub topic_type: TopicType,
}

/// An article-topic link row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleTopicLink {
    pub article_id: String,
    pub topic_id: String,
    pub confidence: f64,
    pub occurrences: u32,
    pub is_primary: bool,
}

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

/// A failure attributable to one source or article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub item_id: String,
    pub message: String,
}

/// Counters for one orchestrated batch stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBatchResult {
    pub stage: String,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Bounded sample of failures (at most [`MAX_ERROR_SAMPLES`]).
    pub errors: Vec<ItemError>,
    /// Some item was written without the optional tag columns.
    pub used_legacy_fallback: bool,
}

impl EnrichmentBatchResult {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, item_id: impl Into<String>, message: impl Into<String>) {
        self.processed += 1;
        self.failed += 1;
        if self.errors.len() < MAX_ERROR_SAMPLES {
            self.errors.push(ItemError {
                item_id: item_id.into(),
                message: message.into(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_maps_to_track() {
        assert_eq!(ContentType::Funding.track(), Track::Capital);
        assert_eq!(ContentType::Budget.track(), Track::Macro);
        assert_eq!(ContentType::Policy.track(), Track::Macro);
        assert_eq!(ContentType::Conflict.track(), Track::Macro);
        assert_eq!(ContentType::Tech.track(), Track::Tech);
        assert_eq!(ContentType::Program.track(), Track::Programs);
    }

    #[test]
    fn enum_strings_parse_back() {
        for status in [
            ContentFetchStatus::Pending,
            ContentFetchStatus::Fetched,
            ContentFetchStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ContentFetchStatus>().unwrap(), status);
        }
        assert!("archived".parse::<ContentFetchStatus>().is_err());
        assert_eq!("platform".parse::<TopicType>().unwrap(), TopicType::Platform);
    }

    #[test]
    fn batch_result_caps_error_samples() {
        let mut result = EnrichmentBatchResult::new("content");
        result.record_success();
        for i in 0..30 {
            result.record_failure(format!("article-{i}"), "boom");
        }
        assert_eq!(result.processed, 31);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 30);
        assert_eq!(result.errors.len(), MAX_ERROR_SAMPLES);
        assert_eq!(result.errors[0].item_id, "article-0");
    }

    #[test]
    fn pulled_item_serialization_skips_empty_options() {
        let item = PulledItem {
            source_id: "defense-news".into(),
            title: "Army awards contract".into(),
            url: "https://example.com/a".into(),
            summary: String::new(),
            published_at: None,
            author: None,
            guid: None,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(!json.contains("published_at"));
        let parsed: PulledItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, item);
    }
}

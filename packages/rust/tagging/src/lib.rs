//! Article tagging: keyword classification and taxonomy topic extraction.
//!
//! This crate provides:
//! - [`classify`]: mission/domain/technology tags, content type, track, high-impact flag
//! - [`TopicExtractor`]: canonical topic matching with context-gated aliases
//! - [`Taxonomy`]: the fixed registry of canonical topics
//! - [`is_low_value_label`] and [`normalize`] helpers

pub mod classifier;
pub mod lowvalue;
pub mod normalize;
pub mod taxonomy;
pub mod topics;

use briefwire_shared::FeedSource;

pub use classifier::{
    DEFAULT_DOMAIN, DEFAULT_OFFICIAL_MISSION, DOMAIN_RULES, KeywordRule, MISSION_RULES,
    TECHNOLOGY_RULES, classify, top_labels,
};
pub use lowvalue::is_low_value_label;
pub use normalize::{normalize, slugify};
pub use taxonomy::{BUILTIN_TOPICS, Taxonomy, TaxonomyTopic, TopicDef};
pub use topics::{MAX_TOPICS_PER_ARTICLE, TopicExtraction, TopicExtractor, strip_noise_lines};

/// Borrowed view of an article for tagging.
#[derive(Debug, Clone, Copy)]
pub struct ArticleText<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub url: &'a str,
    /// Extracted body, when content has been fetched.
    pub full_text: Option<&'a str>,
    pub source: Option<&'a FeedSource>,
}

//! Shared types, error model, configuration, and source registry for Briefwire.
//!
//! This crate is the foundation depended on by all other Briefwire crates.
//! It provides:
//! - [`BriefwireError`], the unified error type
//! - Domain types ([`FeedSource`], [`PulledItem`], [`PersistedArticle`], [`TopicCandidate`], ...)
//! - Configuration ([`AppConfig`], runtime option structs, config loading)
//! - The immutable [`SourceRegistry`]

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContentConfig, ContentOptions, DefaultsConfig, EnrichOptions, EnrichmentConfig,
    IngestConfig, IngestOptions, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from, render_config,
};
pub use error::{BriefwireError, PersistenceErrorKind, Result};
pub use registry::{DEFAULT_SOURCE_WEIGHT, SourceRegistry, load_sources_from};
pub use types::{
    ArticleTags, ArticleTopicLink, Cadence, ContentFetchStatus, ContentType,
    EnrichmentBatchResult, ExtractedContent, ExtractionStatus, FeedSource, ItemError,
    MAX_ERROR_SAMPLES, MatchedBy, PersistedArticle, PulledItem, QualityTier, SourceCategory,
    StoryRole, Topic, TopicCandidate, TopicType, Track,
};

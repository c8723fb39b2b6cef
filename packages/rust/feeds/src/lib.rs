//! Feed fetching, parsing, canonicalization, and ranking.
//!
//! This crate provides:
//! - [`FeedFetcher`]: concurrent RSS/Atom fetcher with isolated per-source failures
//! - [`parse_feed`]: RSS 2.0, RSS 1.0, and Atom parsing via a loose [`XmlValue`] tree
//! - [`canonicalize_url`]: fragment and tracking-parameter stripping
//! - [`rank_items`]: dedup, score, recency filter, and deterministic ordering

pub mod canonical;
pub mod fetch;
pub mod parse;
pub mod rank;
pub mod text;
pub mod xml;

pub use canonical::canonicalize_url;
pub use fetch::{FeedFetcher, FetchReport, SourceFetchError, USER_AGENT};
pub use parse::{FeedKind, parse_feed, parse_timestamp};
pub use rank::{RankOptions, RankedItem, dedup_key, rank_items, rank_score};
pub use text::{SUMMARY_MAX_CHARS, clean_summary, clean_text, truncate_chars};
pub use xml::{XmlNode, XmlValue, parse_document};

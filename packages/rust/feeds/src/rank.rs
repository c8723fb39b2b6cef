//! Dedup, rank, recency filter, and final ordering of pulled items.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use briefwire_shared::{PulledItem, SourceRegistry};

/// Summary characters that count toward the rank score.
const SUMMARY_SCORE_CAP: usize = 320;

/// Knobs for one ranking pass.
#[derive(Debug, Clone, Copy)]
pub struct RankOptions {
    /// Dated items older than this many hours are dropped.
    pub since_hours: u32,
    /// Overall cap on returned items.
    pub limit: usize,
    /// Reference time for the recency window.
    pub now: DateTime<Utc>,
}

/// An item with its computed score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub item: PulledItem,
    pub score: f64,
}

/// `weight * 1000 + published epoch ms + min(summary length, 320)`.
pub fn rank_score(item: &PulledItem, weight: f64) -> f64 {
    let published_ms = item
        .published_at
        .map(|t| t.timestamp_millis() as f64)
        .unwrap_or(0.0);
    let summary = item.summary.chars().count().min(SUMMARY_SCORE_CAP) as f64;
    weight * 1000.0 + published_ms + summary
}

/// Lowercased URL, or normalized title plus publish day when there is no URL.
pub fn dedup_key(item: &PulledItem) -> String {
    let url = item.url.trim();
    if !url.is_empty() {
        return url.to_lowercase();
    }
    let day = item
        .published_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".into());
    format!("{}|{day}", normalize_title(&item.title))
}

fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dedup by [`dedup_key`] keeping the best-scored item, drop stale dated
/// items, then sort and truncate.
///
/// Undated items always survive the recency filter and sort last.
pub fn rank_items(
    items: Vec<PulledItem>,
    registry: &SourceRegistry,
    options: &RankOptions,
) -> Vec<RankedItem> {
    let input = items.len();
    let mut best: Vec<RankedItem> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for item in items {
        let score = rank_score(&item, registry.weight_for(&item.source_id));
        let key = dedup_key(&item);
        match by_key.get(&key) {
            Some(&idx) => {
                if score > best[idx].score {
                    best[idx] = RankedItem { item, score };
                }
            }
            None => {
                by_key.insert(key, best.len());
                best.push(RankedItem { item, score });
            }
        }
    }
    let unique = best.len();

    let cutoff = options
        .now
        .checked_sub_signed(Duration::hours(i64::from(options.since_hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    best.retain(|r| r.item.published_at.is_none_or(|t| t >= cutoff));
    let recent = best.len();

    best.sort_by(compare_ranked);
    best.truncate(options.limit);

    debug!(input, unique, recent, kept = best.len(), "ranked items");
    best
}

/// Published desc (undated last), then score desc, then URL asc.
fn compare_ranked(a: &RankedItem, b: &RankedItem) -> Ordering {
    b.item
        .published_at
        .cmp(&a.item.published_at)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.item.url.cmp(&b.item.url))
}

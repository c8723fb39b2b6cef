//! RSS 2.0 / RSS 1.0 / Atom parsing into [`PulledItem`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;
use url::Url;

use briefwire_shared::{BriefwireError, FeedSource, PulledItem, Result};

use crate::canonical::canonicalize_url;
use crate::text::{clean_summary, clean_text};
use crate::xml::{XmlValue, parse_document};

const DATE_KEYS: &[&str] = &["pubDate", "published", "updated", "dc:date", "date"];
const SUMMARY_KEYS: &[&str] = &["description", "summary", "content:encoded", "content"];
const AUTHOR_KEYS: &[&str] = &["author/name", "dc:creator", "author"];
const GUID_KEYS: &[&str] = &["guid", "id"];

/// Which family a document belongs to, decided by the root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Atom,
}

/// Parse a feed body for `source`. Entries without a title or a resolvable
/// link are dropped.
pub fn parse_feed(body: &str, source: &FeedSource) -> Result<Vec<PulledItem>> {
    let (root_name, root) = parse_document(body)?;
    let kind = detect_kind(&root_name)?;

    let entries: Vec<&XmlValue> = match kind {
        FeedKind::Atom => root.all("entry"),
        FeedKind::Rss => {
            let mut items = root.all("channel/item");
            // RSS 1.0 puts items beside the channel.
            items.extend(root.all("item"));
            items
        }
    };

    let base = Url::parse(&source.homepage_url).ok();
    let total = entries.len();
    let items: Vec<PulledItem> = entries
        .into_iter()
        .filter_map(|entry| entry_to_item(entry, source, base.as_ref()))
        .collect();

    debug!(
        source = %source.id,
        ?kind,
        entries = total,
        kept = items.len(),
        "parsed feed"
    );
    Ok(items)
}

fn detect_kind(root_name: &str) -> Result<FeedKind> {
    let local = root_name.rsplit(':').next().unwrap_or(root_name);
    match local {
        "rss" | "RDF" => Ok(FeedKind::Rss),
        "feed" => Ok(FeedKind::Atom),
        other => Err(BriefwireError::parse(format!(
            "unsupported feed root element <{other}>"
        ))),
    }
}

fn entry_to_item(entry: &XmlValue, source: &FeedSource, base: Option<&Url>) -> Option<PulledItem> {
    let title = entry.first_text(&["title"]).map(|t| clean_text(&t))?;
    if title.is_empty() {
        return None;
    }

    let guid = entry.first_text(GUID_KEYS);
    let url = link_candidates(entry, guid.as_deref())
        .into_iter()
        .find_map(|candidate| canonicalize_url(&candidate, base))?;

    let summary = entry
        .first_text(SUMMARY_KEYS)
        .map(|s| clean_summary(&s))
        .unwrap_or_default();

    let published_at = DATE_KEYS
        .iter()
        .filter_map(|key| entry.get(key).and_then(XmlValue::text))
        .find_map(parse_timestamp);

    let author = entry
        .first_text(AUTHOR_KEYS)
        .map(|a| clean_text(&a))
        .filter(|a| !a.is_empty());

    Some(PulledItem {
        source_id: source.id.clone(),
        title,
        url,
        summary,
        published_at,
        author,
        guid,
    })
}

/// Link candidates in priority order: direct link text, alternate atom
/// link href, then a guid that looks like a URL.
fn link_candidates(entry: &XmlValue, guid: Option<&str>) -> Vec<String> {
    let mut out = Vec::new();
    let links = entry.all("link");

    for link in &links {
        if let Some(text) = link.text() {
            out.push(text.to_string());
        }
    }
    let hrefs = links
        .iter()
        .filter(|l| matches!(l.attr("rel"), None | Some("alternate")))
        .chain(links.iter())
        .filter_map(|l| l.attr("href"));
    out.extend(hrefs.map(str::to_string));

    if let Some(guid) = guid {
        if guid.starts_with("http://") || guid.starts_with("https://") {
            out.push(guid.to_string());
        }
    }
    out
}

/// Parse RFC 2822 or RFC 3339, plus a couple of common sloppy variants.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

//! Lead image selection.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Social meta tags checked in priority order.
const META_IMAGE_KEYS: &[&str] = &[
    "og:image",
    "og:image:url",
    "og:image:secure_url",
    "twitter:image",
    "twitter:image:src",
];

/// Containers searched for a fallback `<img>`, in order.
const IMAGE_CONTAINERS: &[&str] = &["article", "main", "body"];

static LOGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)logo|sprite|icon|avatar").expect("valid regex"));

/// Pick the lead image for a page, resolved to an absolute URL.
pub fn lead_image(doc: &Html, page_url: &Url) -> Option<String> {
    meta_image(doc, page_url).or_else(|| inline_image(doc, page_url))
}

/// First meta image, by key priority, that resolves to a usable URL.
fn meta_image(doc: &Html, page_url: &Url) -> Option<String> {
    static META_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("meta").expect("valid selector"));

    let metas: Vec<_> = doc.select(&META_SEL).collect();
    META_IMAGE_KEYS.iter().find_map(|key| {
        metas.iter().find_map(|meta| {
            let value = meta.value();
            let name = value.attr("property").or_else(|| value.attr("name"))?;
            if !name.eq_ignore_ascii_case(key) {
                return None;
            }
            value
                .attr("content")
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .and_then(|c| resolve(page_url, c))
        })
    })
}

fn inline_image(doc: &Html, page_url: &Url) -> Option<String> {
    static IMG_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("img").expect("valid selector"));

    for container in IMAGE_CONTAINERS {
        let Ok(sel) = Selector::parse(container) else {
            continue;
        };
        let Some(root) = doc.select(&sel).next() else {
            continue;
        };
        for img in root.select(&IMG_SEL) {
            let value = img.value();
            let Some(src) = value
                .attr("src")
                .or_else(|| value.attr("data-src"))
                .map(str::trim)
                .filter(|s| !s.is_empty() && !s.starts_with("data:"))
            else {
                continue;
            };
            if !usable_image(src) {
                continue;
            }
            if let Some(resolved) = resolve(page_url, src) {
                return Some(resolved);
            }
        }
    }
    None
}

/// SVGs and logo-like assets never make a lead image.
fn usable_image(src: &str) -> bool {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    !path.to_ascii_lowercase().ends_with(".svg") && !LOGO_RE.is_match(src)
}

fn resolve(page_url: &Url, raw: &str) -> Option<String> {
    let url = page_url.join(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://news.example.com/2026/01/story").unwrap()
    }

    #[test]
    fn og_image_wins_over_inline() {
        let doc = Html::parse_document(
            r#"<html><head>
              <meta name="twitter:image" content="/tw.jpg">
              <meta property="og:image" content="https://cdn.example.com/og.jpg">
            </head><body><article><img src="/inline.jpg"></article></body></html>"#,
        );
        assert_eq!(
            lead_image(&doc, &page()).as_deref(),
            Some("https://cdn.example.com/og.jpg")
        );
    }

    #[test]
    fn meta_order_is_respected() {
        let doc = Html::parse_document(
            r#"<html><head>
              <meta name="twitter:image:src" content="/second.jpg">
              <meta name="twitter:image" content="/first.jpg">
            </head><body></body></html>"#,
        );
        assert_eq!(
            lead_image(&doc, &page()).as_deref(),
            Some("https://news.example.com/first.jpg")
        );
    }

    #[test]
    fn unresolvable_meta_falls_through_to_next_key() {
        let doc = Html::parse_document(
            r#"<html><head>
              <meta property="og:image" content="ftp://files.example.com/og.jpg">
              <meta name="twitter:image" content="/tw.jpg">
            </head><body><article><img src="/inline.jpg"></article></body></html>"#,
        );
        assert_eq!(
            lead_image(&doc, &page()).as_deref(),
            Some("https://news.example.com/tw.jpg")
        );
    }

    #[test]
    fn inline_skips_svg_and_logos() {
        let doc = Html::parse_document(
            r#"<html><body><article>
              <img src="/assets/site-logo.png">
              <img src="/assets/chart.svg?v=2">
              <img data-src="photos/hero.jpg">
            </article></body></html>"#,
        );
        assert_eq!(
            lead_image(&doc, &page()).as_deref(),
            Some("https://news.example.com/2026/01/photos/hero.jpg")
        );
    }

    #[test]
    fn no_image_found() {
        let doc = Html::parse_document("<html><body><p>text only</p></body></html>");
        assert_eq!(lead_image(&doc, &page()), None);
    }
}

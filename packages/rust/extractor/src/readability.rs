//! Main-content detection.
//!
//! Paragraph containers are scored by text length and comma count, with
//! link-heavy and chrome-like containers penalized. When the winner is too
//! thin, well-known article selectors are tried, then the whole body.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Below this many words the readability pick is not trusted.
pub const MIN_PRIMARY_WORDS: usize = 80;

/// Selectors tried, in order, when readability comes up short.
pub const FALLBACK_SELECTORS: &[&str] = &[
    "article",
    "main",
    r#"[role="main"]"#,
    ".article-body",
    ".article-content",
    ".entry-content",
    ".post-content",
    ".story-body",
    "#content",
    ".content",
];

/// Elements whose text never counts as article body.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript", "iframe", "svg",
    "button", "template",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5",
    "h6", "blockquote", "pre", "br", "tr", "table", "figure", "figcaption", "dd", "dt",
];

/// Paragraphs shorter than this are ignored for scoring.
const MIN_PARAGRAPH_CHARS: usize = 25;

static CHROME_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)comment|footer|sidebar|sidenav|\bnav|menu|share|social|related|promo|advert|\bads?\b|newsletter|subscribe|cookie|banner|popup|breadcrumb",
    )
    .expect("valid regex")
});

static CONTENT_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|main|post|story|text|prose").expect("valid regex")
});

/// Which strategy produced the body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource {
    Readability,
    Selector(&'static str),
    Body,
}

/// Extracted body text and how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyText {
    pub text: String,
    pub source: BodySource,
}

impl BodyText {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Find the article body in `doc`.
pub fn extract_body(doc: &Html) -> BodyText {
    if let Some(best) = best_candidate(doc) {
        let text = element_text(best);
        if word_count(&text) >= MIN_PRIMARY_WORDS {
            return BodyText {
                text,
                source: BodySource::Readability,
            };
        }
    }

    for &selector in FALLBACK_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(el) = doc.select(&sel).next() {
            let text = element_text(el);
            if word_count(&text) >= MIN_PRIMARY_WORDS {
                return BodyText {
                    text,
                    source: BodySource::Selector(selector),
                };
            }
        }
    }

    static BODY_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));
    let text = doc
        .select(&BODY_SEL)
        .next()
        .map(element_text)
        .unwrap_or_default();
    BodyText {
        text,
        source: BodySource::Body,
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Highest-scoring paragraph container, if any paragraph qualified.
fn best_candidate(doc: &Html) -> Option<ElementRef<'_>> {
    static P_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("p, pre").expect("valid selector"));

    let mut scores = HashMap::new();

    for paragraph in doc.select(&P_SEL) {
        let text = element_text(paragraph);
        let len = text.chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let commas = text.matches(',').count() as f64;
        let score = 1.0 + commas + (len as f64 / 100.0).min(3.0);

        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        scores
            .entry(parent.id())
            .or_insert_with(|| (parent, initial_score(parent)))
            .1 += score;

        if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
            scores
                .entry(grandparent.id())
                .or_insert_with(|| (grandparent, initial_score(grandparent)))
                .1 += score / 2.0;
        }
    }

    scores
        .into_values()
        .map(|(el, score)| (el, score * (1.0 - link_density(el))))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(el, _)| el)
}

/// Class/id hints: chrome-like names are penalized, article-like names rewarded.
fn initial_score(el: ElementRef<'_>) -> f64 {
    let value = el.value();
    let hints = format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.attr("id").unwrap_or_default()
    );
    let mut score = match value.name() {
        "article" => 10.0,
        "div" | "section" | "main" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "form" | "ul" | "ol" | "li" => -3.0,
        _ => 0.0,
    };
    if CHROME_HINT_RE.is_match(&hints) {
        score -= 25.0;
    }
    if CONTENT_HINT_RE.is_match(&hints) {
        score += 25.0;
    }
    score
}

/// Share of an element's text that sits inside links.
fn link_density(el: ElementRef<'_>) -> f64 {
    static A_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a").expect("valid selector"));

    let total: usize = el.text().map(|t| t.trim().chars().count()).sum();
    if total == 0 {
        return 1.0;
    }
    let linked: usize = el
        .select(&A_SEL)
        .flat_map(|a| a.text())
        .map(|t| t.trim().chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

/// Visible text of `el` with chrome elements skipped. Block elements become
/// paragraph breaks; whitespace inside a paragraph is collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

//! Free-text cleanup for feed fields.

use std::sync::LazyLock;

use regex::Regex;

/// Summaries longer than this are cut and end with `…`.
pub const SUMMARY_MAX_CHARS: usize = 420;

static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip tags, decode entities, and collapse whitespace.
pub fn clean_text(input: &str) -> String {
    let without_scripts = SCRIPT_STYLE.replace_all(input, " ");
    let without_tags = TAG.replace_all(&without_scripts, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    // Double-escaped feeds (`&amp;amp;`) need a second pass.
    let decoded = html_escape::decode_html_entities(&decoded).replace('\u{a0}', " ");
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Truncate to at most `max` characters, ending with `…` when cut.
pub fn truncate_chars(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let kept: String = input.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

/// Clean a feed summary and cap it at [`SUMMARY_MAX_CHARS`].
pub fn clean_summary(input: &str) -> String {
    truncate_chars(&clean_text(input), SUMMARY_MAX_CHARS)
}

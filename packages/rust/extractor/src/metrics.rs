//! Word counts, reading time, excerpts, and content hashes.

use sha2::{Digest, Sha256};

/// Assumed reading speed in words per minute.
pub const WORDS_PER_MINUTE: usize = 220;

/// Target excerpt length in characters, before the ellipsis.
pub const EXCERPT_MAX_CHARS: usize = 460;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// `max(1, ceil(words / 220))`.
pub fn reading_minutes(words: usize) -> u32 {
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Leading text cut at a word boundary, with `…` appended when truncated.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }

    let cut: String = flat.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!(
        "{}…",
        trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation())
    )
}

/// SHA-256 hex digest.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_minutes_rounds_up_with_floor_of_one() {
        assert_eq!(reading_minutes(0), 1);
        assert_eq!(reading_minutes(40), 1);
        assert_eq!(reading_minutes(220), 1);
        assert_eq!(reading_minutes(221), 2);
        assert_eq!(reading_minutes(1000), 5);
    }

    #[test]
    fn excerpt_cuts_on_word_boundary() {
        let text = "alpha beta gamma delta";
        assert_eq!(excerpt(text, 100), "alpha beta gamma delta");
        assert_eq!(excerpt(text, 13), "alpha beta…");
        assert_eq!(excerpt("one, two three", 6), "one…");
    }

    #[test]
    fn excerpt_collapses_paragraph_breaks() {
        assert_eq!(excerpt("First.\n\nSecond.", 100), "First. Second.");
    }

    #[test]
    fn test_compute_hash() {
        let hash = compute_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("  a b\n\nc\td "), 4);
        assert_eq!(word_count(""), 0);
    }
}

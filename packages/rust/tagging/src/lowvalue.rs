//! Rejects candidate topic labels that carry no information.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::normalize;

const MAX_LABEL_TOKENS: usize = 7;

const HEADLINE_JUNK: &[&str] = &[
    "read more",
    "live updates",
    "breaking news",
    "watch live",
    "click here",
    "sign up",
    "subscribe",
    "latest news",
    "top stories",
    "full story",
    "photo gallery",
    "related articles",
    "more news",
    "share this",
    "editor s note",
    "press release",
    "news release",
    "learn more",
];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "in", "into", "is", "it", "its", "new", "not", "of", "on", "or", "our", "over",
    "says", "said", "she", "that", "the", "their", "they", "this", "to", "under", "was", "we",
    "what", "when", "where", "which", "who", "why", "will", "with", "you",
];

const DAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "mon", "tue",
    "tues", "wed", "thu", "thur", "thurs", "fri", "sat", "sun",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep",
    "sept", "oct", "nov", "dec",
];

const MAJOR_CITIES: &[&str] = &[
    "washington", "arlington", "london", "paris", "berlin", "brussels", "tokyo", "seoul",
    "canberra", "ottawa", "geneva", "singapore", "dubai", "warsaw", "rome", "madrid",
];

const CALENDAR_EXTRA: &[&str] = &[
    "today", "yesterday", "tomorrow", "week", "weekend", "month", "year", "am", "pm", "et", "est",
    "edt", "utc", "gmt", "morning", "afternoon", "evening", "night",
];

fn is_calendar_token(token: &str) -> bool {
    DAYS.contains(&token)
        || MONTHS.contains(&token)
        || CALENDAR_EXTRA.contains(&token)
        || token.chars().all(|c| c.is_ascii_digit())
        || is_ordinal(token)
}

fn is_ordinal(token: &str) -> bool {
    let digits = token.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix = &token[digits.len()..];
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(suffix, "st" | "nd" | "rd" | "th")
}

/// Matches wire-service prefixes, update stamps, and all-caps `CITY —` datelines.
fn is_dateline_fragment(raw: &str, normalized: &str) -> bool {
    static WIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:ap|afp|reuters|upi|dpa|ani|pti)(?:\s|$)").expect("valid regex")
    });
    static STAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:updated|posted|published|last updated|released)(?:\s|$)")
            .expect("valid regex")
    });
    static CAPS_DASH_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[A-Z][A-Z.,' ]{1,40}(?:\s+-|\s*[\u{2013}\u{2014}])").expect("valid regex")
    });

    WIRE_RE.is_match(normalized) || STAMP_RE.is_match(normalized) || CAPS_DASH_RE.is_match(raw.trim())
}

/// Whether `label` should never become a topic on its own.
pub fn is_low_value_label(label: &str) -> bool {
    let normalized = normalize(label);
    if normalized.chars().count() < 3 {
        return true;
    }
    if !normalized.chars().any(char::is_alphabetic) {
        return true;
    }
    if HEADLINE_JUNK.iter().any(|junk| contains_phrase(&normalized, junk)) {
        return true;
    }
    if is_dateline_fragment(label, &normalized) {
        return true;
    }

    let tokens: Vec<&str> = normalized.split(' ').collect();
    if tokens.len() > MAX_LABEL_TOKENS {
        return true;
    }
    if tokens.len() == 1 {
        let t = tokens[0];
        if STOPWORDS.contains(&t) || DAYS.contains(&t) || MONTHS.contains(&t) || MAJOR_CITIES.contains(&t)
        {
            return true;
        }
    }
    if tokens.iter().all(|t| STOPWORDS.contains(t)) {
        return true;
    }
    tokens.iter().all(|t| is_calendar_token(t))
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack == phrase
        || haystack.starts_with(&format!("{phrase} "))
        || haystack.ends_with(&format!(" {phrase}"))
        || haystack.contains(&format!(" {phrase} "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_and_numeric() {
        assert!(is_low_value_label(""));
        assert!(is_low_value_label("US"));
        assert!(is_low_value_label("2026 - 15"));
        assert!(is_low_value_label("#1"));
    }

    #[test]
    fn rejects_headline_junk_and_datelines() {
        assert!(is_low_value_label("Read More"));
        assert!(is_low_value_label("Live Updates: Army"));
        assert!(is_low_value_label("WASHINGTON \u{2014} The"));
        assert!(is_low_value_label("Updated Jan 5"));
        assert!(is_low_value_label("AP Photo"));
    }

    #[test]
    fn rejects_calendar_and_single_tokens() {
        assert!(is_low_value_label("MONDAY, JANUARY 15, 2026"));
        assert!(is_low_value_label("Jan 15th"));
        assert!(is_low_value_label("Washington"));
        assert!(is_low_value_label("The"));
        assert!(is_low_value_label("Of The"));
    }

    #[test]
    fn rejects_long_labels() {
        assert!(is_low_value_label(
            "Army Navy Air Force Marine Corps Space Force Coast Guard"
        ));
    }

    #[test]
    fn keeps_real_entities() {
        assert!(!is_low_value_label("Golden Dome"));
        assert!(!is_low_value_label("Sentinel Program Office"));
        assert!(!is_low_value_label("Anduril"));
        assert!(!is_low_value_label("USAF-led Exercise"));
        assert!(!is_low_value_label("$1.2 billion"));
    }
}

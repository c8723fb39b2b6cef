//! Text normalization shared by topic matching and label filtering.

/// Lowercase, unify quote and dash variants, replace punctuation outside
/// `-`, `&`, `+` with spaces, and collapse whitespace.
///
/// `"D.o.D."` becomes `"d o d"`; `"F‑35A"` becomes `"f-35a"`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        let ch = match ch {
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' | '\u{2032}' | '`' => '\'',
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' | '\u{2033}' => '"',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
            | '\u{2212}' => '-',
            other => other,
        };

        let keep = ch.is_alphanumeric() || matches!(ch, '-' | '&' | '+');
        if keep {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Normalized text split into tokens.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Count non-overlapping whole-token occurrences of `needle` in `haystack`.
pub fn count_token_phrase(haystack: &[String], needle: &[String]) -> u32 {
    find_token_phrase(haystack, needle).len() as u32
}

/// Start positions of non-overlapping whole-token matches.
pub fn find_token_phrase(haystack: &[String], needle: &[String]) -> Vec<usize> {
    let mut hits = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return hits;
    }
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()] == *needle {
            hits.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    hits
}

/// URL-safe slug: lowercase alphanumeric runs joined by `-`.
pub fn slugify(label: &str) -> String {
    let replaced = label.replace('&', " and ").replace('+', " plus ");
    replaced
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn normalize_unifies_punctuation() {
        assert_eq!(normalize("D.o.D. briefs   reporters"), "d o d briefs reporters");
        assert_eq!(normalize("F\u{2011}35A \u{201c}Lightning\u{201d}"), "f-35a lightning");
        assert_eq!(normalize("R&D + test, eval"), "r&d + test eval");
        assert_eq!(normalize("Army\u{2019}s budget"), "army s budget");
        assert_eq!(normalize("  ...  "), "");
    }

    #[test]
    fn phrase_matching_is_whole_token_and_non_overlapping() {
        let hay = tokens("the dod and the d o d said dods");
        assert_eq!(count_token_phrase(&hay, &toks(&["dod"])), 1);
        assert_eq!(count_token_phrase(&hay, &toks(&["d", "o", "d"])), 1);

        let repeated = tokens("a a a");
        assert_eq!(count_token_phrase(&repeated, &toks(&["a", "a"])), 1);
    }

    #[test]
    fn slugify_labels() {
        assert_eq!(slugify("Department of Defense"), "department-of-defense");
        assert_eq!(slugify("F-35 Lightning II"), "f-35-lightning-ii");
        assert_eq!(slugify("Research & Development"), "research-and-development");
    }
}

//! Topic/entity extraction against the canonical taxonomy.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use briefwire_shared::{MatchedBy, SourceCategory, SourceRegistry, TopicCandidate, TopicType};

use crate::ArticleText;
use crate::lowvalue::is_low_value_label;
use crate::normalize::{count_token_phrase, find_token_phrase, slugify, tokens};
use crate::taxonomy::{Taxonomy, TaxonomyTopic};

/// Maximum topics kept per article.
pub const MAX_TOPICS_PER_ARTICLE: usize = 24;

/// Occurrences at or above this make a topic primary even without a title hit.
const PRIMARY_OCCURRENCES: u32 = 3;

const PHRASE_MIN_TOKENS: usize = 2;
const PHRASE_MAX_TOKENS: usize = 7;
const PHRASE_CONNECTORS: &[&str] = &["of", "the", "and", "for", "&", "on", "de"];

/// Topics found in one article, sorted and capped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicExtraction {
    pub topics: Vec<TopicCandidate>,
    /// Whether defense context was detected (gates ambiguous aliases).
    pub defense_context: bool,
}

impl TopicExtraction {
    /// Taxonomy-backed candidates only. Phrase candidates are never stored.
    pub fn persistable(&self) -> Vec<&TopicCandidate> {
        self.topics
            .iter()
            .filter(|t| t.matched_by != MatchedBy::Phrase)
            .collect()
    }
}

/// Matches taxonomy aliases (and supplemental capitalized phrases) in article text.
#[derive(Debug, Clone, Copy)]
pub struct TopicExtractor<'a> {
    taxonomy: &'a Taxonomy,
    registry: Option<&'a SourceRegistry>,
}

impl Default for TopicExtractor<'static> {
    fn default() -> Self {
        Self::new(Taxonomy::builtin())
    }
}

impl<'a> TopicExtractor<'a> {
    pub fn new(taxonomy: &'a Taxonomy) -> Self {
        Self {
            taxonomy,
            registry: None,
        }
    }

    /// Treat membership in `registry` as a defense-context signal.
    pub fn with_registry(mut self, registry: &'a SourceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn extract(&self, input: &ArticleText<'_>) -> TopicExtraction {
        let raw = build_corpus(input);
        let corpus = tokens(&raw);
        let title = tokens(input.title);
        let defense_context = self.has_defense_context(input, &raw);

        let mut topics: Vec<TopicCandidate> = self
            .taxonomy
            .topics()
            .iter()
            .filter_map(|topic| match_topic(topic, &corpus, &title, defense_context))
            .collect();

        let matched: HashSet<String> = topics.iter().map(|t| t.slug.clone()).collect();
        topics.extend(self.phrase_candidates(input, &corpus, &title, defense_context, &matched));

        topics.sort_by(compare_candidates);
        topics.truncate(MAX_TOPICS_PER_ARTICLE);

        debug!(
            tokens = corpus.len(),
            topics = topics.len(),
            defense_context,
            "extracted topics"
        );

        TopicExtraction {
            topics,
            defense_context,
        }
    }

    fn has_defense_context(&self, input: &ArticleText<'_>, raw: &str) -> bool {
        static SOURCE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"(?i)\b(?:defen[cs]e|military|army|navy|naval|air force|space force|marines?|pentagon|war|security|c4isr)\b",
            )
            .expect("valid regex")
        });

        if let Some(source) = input.source {
            if source.category == SourceCategory::Official {
                return true;
            }
            if self.registry.is_some_and(|r| r.contains(&source.id)) {
                return true;
            }
            if SOURCE_NAME_RE.is_match(&source.name) {
                return true;
            }
        }
        DEFENSE_KEYWORD_RES.iter().any(|re| re.is_match(raw))
    }

    fn phrase_candidates(
        &self,
        input: &ArticleText<'_>,
        corpus: &[String],
        title: &[String],
        defense_context: bool,
        matched: &HashSet<String>,
    ) -> Vec<TopicCandidate> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();

        for phrase in capitalized_phrases(input.title)
            .into_iter()
            .chain(capitalized_phrases(input.summary))
        {
            let slug = slugify(&phrase);
            if slug.is_empty() || matched.contains(&slug) || !seen.insert(slug.clone()) {
                continue;
            }
            let phrase_tokens = tokens(&phrase);
            if self.covered_by_taxonomy(&phrase_tokens, defense_context)
                || is_low_value_label(&phrase)
            {
                continue;
            }

            let occurrences = count_token_phrase(corpus, &phrase_tokens);
            let title_match = count_token_phrase(title, &phrase_tokens) > 0;
            if occurrences == 0 || !(title_match || occurrences >= 2) {
                continue;
            }

            out.push(TopicCandidate {
                slug,
                label: phrase,
                topic_type: TopicType::Concept,
                occurrences,
                confidence: phrase_confidence(title_match, occurrences),
                is_primary: title_match || occurrences >= PRIMARY_OCCURRENCES,
                matched_by: MatchedBy::Phrase,
            });
        }
        out
    }

    fn covered_by_taxonomy(&self, phrase_tokens: &[String], defense_context: bool) -> bool {
        self.taxonomy.topics().iter().any(|topic| {
            topic
                .aliases
                .iter()
                .filter(|a| defense_context || !a.context_gated)
                .any(|a| !find_token_phrase(phrase_tokens, &a.tokens).is_empty())
        })
    }
}

/// Domain keyword patterns; any hit on the raw text signals defense context.
static DEFENSE_KEYWORD_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:missiles?|munitions?|warheads?|interceptors?|artillery|howitzers?|fighter jets?|warships?|submarines?|hypersonic)\b",
        r"(?i)\b(?:procurement|acquisition programs?|defen[cs]e contracts?|contract awards?|program offices?|budget requests?)\b",
        r"(?i)\b(?:military|troops|warfighters?|soldiers|sailors|airmen|brigades?|battalions?|combatant commands?|armed forces)\b",
        r"(?i)\b(?:pentagon|department of (?:defen[cs]e|war)|secretary of (?:defen[cs]e|war)|joint chiefs|national security)\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Title, summary, and body joined by newlines, with noise lines removed
/// for official guidance sources.
fn build_corpus(input: &ArticleText<'_>) -> String {
    let joined = [input.title, input.summary, input.full_text.unwrap_or_default()].join("\n");
    match input.source {
        Some(source) if source.is_official_guidance() => strip_noise_lines(&joined),
        _ => joined,
    }
}

/// Drop update stamps, bare datelines, and date-only lines.
pub fn strip_noise_lines(text: &str) -> String {
    static NOISE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        [
            r"(?i)^\s*(?:updated|posted|published|released|last updated|as of)\b.{0,80}$",
            r"^\s*[A-Z][A-Z .,'-]{2,40}\s*[-\x{2013}\x{2014}]+\s*$",
            r"(?i)^\s*(?:(?:mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)[a-z]*\.?,?\s+)?(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?(?:\s+\d{4})?\s*$",
            r"^\s*\d{1,2}/\d{1,2}/\d{2,4}\s*$",
        ]
        .into_iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    });

    text.lines()
        .filter(|line| !NOISE_RES.iter().any(|re| re.is_match(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn match_topic(
    topic: &TaxonomyTopic,
    corpus: &[String],
    title: &[String],
    defense_context: bool,
) -> Option<TopicCandidate> {
    let mut consumed = vec![false; corpus.len()];
    let mut occurrences = 0u32;
    let mut title_match = false;
    let mut plain_hit = false;

    // Aliases are ordered longest first, so "department of defense" claims
    // its tokens before any shorter alias can.
    for alias in &topic.aliases {
        if alias.context_gated && !defense_context {
            continue;
        }
        let hits = claim_matches(corpus, &alias.tokens, &mut consumed);
        if hits > 0 {
            occurrences += hits;
            plain_hit |= !alias.context_gated;
            title_match |= count_token_phrase(title, &alias.tokens) > 0;
        }
    }

    if occurrences == 0 {
        return None;
    }

    Some(TopicCandidate {
        slug: topic.slug.clone(),
        label: topic.label.clone(),
        topic_type: topic.topic_type,
        occurrences,
        confidence: taxonomy_confidence(title_match, occurrences),
        is_primary: title_match || occurrences >= PRIMARY_OCCURRENCES,
        matched_by: if plain_hit {
            MatchedBy::Alias
        } else {
            MatchedBy::ContextAlias
        },
    })
}

/// Count matches whose tokens are not yet claimed by a longer alias.
fn claim_matches(corpus: &[String], needle: &[String], consumed: &mut [bool]) -> u32 {
    let n = needle.len();
    if n == 0 || n > corpus.len() {
        return 0;
    }
    let mut hits = 0;
    let mut i = 0;
    while i + n <= corpus.len() {
        if corpus[i..i + n] == *needle && !consumed[i..i + n].iter().any(|&c| c) {
            consumed[i..i + n].iter_mut().for_each(|c| *c = true);
            hits += 1;
            i += n;
        } else {
            i += 1;
        }
    }
    hits
}

fn taxonomy_confidence(title_match: bool, occurrences: u32) -> f64 {
    let title = if title_match { 0.1 } else { 0.0 };
    (0.84 + title + 0.01 * f64::from(occurrences.min(8))).min(0.99)
}

fn phrase_confidence(title_match: bool, occurrences: u32) -> f64 {
    let title = if title_match { 0.1 } else { 0.0 };
    (0.55 + title + 0.02 * f64::from(occurrences.min(8))).min(0.8)
}

/// isPrimary desc, confidence desc, occurrences desc, label asc.
fn compare_candidates(a: &TopicCandidate, b: &TopicCandidate) -> std::cmp::Ordering {
    b.is_primary
        .cmp(&a.is_primary)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| b.occurrences.cmp(&a.occurrences))
        .then_with(|| a.label.cmp(&b.label))
}

/// Runs of capitalized words (allowing short connectors inside), split at
/// clause punctuation. Only runs of 2 to 7 tokens are returned.
pub fn capitalized_phrases(text: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for raw in text.split_whitespace() {
        let core = raw.trim_matches(|c: char| !(c.is_alphanumeric() || matches!(c, '&' | '-' | '.')));
        let has_inner_dot = core.trim_end_matches('.').contains('.');
        let word = if has_inner_dot {
            core
        } else {
            core.trim_end_matches('.')
        };
        let ends_clause = raw.ends_with([',', ':', ';', '?', '!', ')', '"'])
            || raw.ends_with('\u{201d}')
            || (raw.ends_with('.') && !has_inner_dot);

        if word.is_empty() || word.chars().all(|c| c == '-' || c == '.') {
            flush_phrase(&mut current, &mut phrases);
            continue;
        }

        let capitalized = word.chars().next().is_some_and(char::is_uppercase);
        let connector = PHRASE_CONNECTORS.contains(&word.to_lowercase().as_str());
        if capitalized && !(connector && current.is_empty() && word.len() <= 3 && word != "&") {
            current.push(word.to_string());
        } else if connector && !current.is_empty() {
            current.push(word.to_string());
        } else {
            flush_phrase(&mut current, &mut phrases);
        }

        if ends_clause {
            flush_phrase(&mut current, &mut phrases);
        }
    }
    flush_phrase(&mut current, &mut phrases);
    phrases
}

fn flush_phrase(current: &mut Vec<String>, phrases: &mut Vec<String>) {
    let is_connector = |w: &String| PHRASE_CONNECTORS.contains(&w.to_lowercase().as_str());
    while current.last().is_some_and(is_connector) {
        current.pop();
    }
    while current.first().is_some_and(|w| matches!(w.to_lowercase().as_str(), "a" | "an" | "the")) {
        current.remove(0);
    }
    if (PHRASE_MIN_TOKENS..=PHRASE_MAX_TOKENS).contains(&current.len()) {
        phrases.push(current.join(" "));
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefwire_shared::{Cadence, FeedSource, QualityTier, StoryRole};

    fn article<'a>(title: &'a str, summary: &'a str) -> ArticleText<'a> {
        ArticleText {
            title,
            summary,
            url: "https://example.com/story",
            full_text: None,
            source: None,
        }
    }

    fn slugs(extraction: &TopicExtraction) -> Vec<&str> {
        extraction.topics.iter().map(|t| t.slug.as_str()).collect()
    }

    #[test]
    fn context_gated_alias_requires_defense_signal() {
        let extractor = TopicExtractor::default();

        let defense = extractor.extract(&article("DOW memo informs new missile procurement", ""));
        let dod = defense
            .topics
            .iter()
            .find(|t| t.slug == "department-of-defense")
            .expect("context alias matched");
        assert_eq!(dod.label, "Department of Defense");
        assert_eq!(dod.matched_by, MatchedBy::ContextAlias);
        assert!(dod.is_primary);
        assert!(defense.defense_context);

        let markets = extractor.extract(&article("Dow closes higher as markets rebound", ""));
        assert!(!slugs(&markets).contains(&"department-of-defense"));
        assert!(!markets.defense_context);
    }

    #[test]
    fn alias_variants_collapse_into_one_topic() {
        let extraction =
            TopicExtractor::default().extract(&article("DOD and D.o.D. brief reporters", ""));
        assert_eq!(extraction.topics.len(), 1);
        let dod = &extraction.topics[0];
        assert_eq!(dod.slug, "department-of-defense");
        assert_eq!(dod.occurrences, 2);
        assert_eq!(dod.matched_by, MatchedBy::Alias);
    }

    #[test]
    fn dateline_and_junk_headline_yield_no_phrase_topics() {
        let extraction = TopicExtractor::default()
            .extract(&article("MONDAY, JANUARY 15, 2026 \u{2014} Read More", ""));
        assert!(
            extraction
                .topics
                .iter()
                .all(|t| t.matched_by != MatchedBy::Phrase)
        );
        assert!(extraction.topics.is_empty());
    }

    #[test]
    fn confidence_and_primary_rules() {
        let text = "The Pentagon said. The Pentagon added. The Pentagon confirmed. Pentagon again.";
        let extraction = TopicExtractor::default().extract(&ArticleText {
            title: "Budget talks continue",
            summary: "",
            url: "https://example.com/x",
            full_text: Some(text),
            source: None,
        });
        let dod = &extraction.topics[0];
        assert_eq!(dod.occurrences, 4);
        assert!(dod.is_primary);
        assert!((dod.confidence - 0.88).abs() < 1e-9);

        let many = "Golden Dome ".repeat(20);
        let capped = TopicExtractor::default().extract(&article("Golden Dome update", &many));
        let dome = capped.topics.iter().find(|t| t.slug == "golden-dome").unwrap();
        assert!((dome.confidence - 0.99).abs() < 1e-9);
    }

    #[test]
    fn phrase_candidates_are_supplemental_and_not_persistable() {
        let extraction = TopicExtractor::default().extract(&article(
            "Army Contracting Command picks Castelion for Blackbeard",
            "Army Contracting Command said the award covers production.",
        ));
        let phrase = extraction
            .topics
            .iter()
            .find(|t| t.matched_by == MatchedBy::Phrase)
            .expect("phrase candidate");
        assert_eq!(phrase.topic_type, TopicType::Concept);
        assert!(phrase.confidence <= 0.8);
        assert!(
            extraction
                .persistable()
                .iter()
                .all(|t| t.matched_by != MatchedBy::Phrase)
        );
        assert!(slugs(&extraction).contains(&"us-army"));
    }

    #[test]
    fn phrases_containing_taxonomy_aliases_are_not_emitted() {
        let covered = TopicExtractor::default().extract(&article(
            "Golden Dome Program Office Expands Staff",
            "Hiring continues.",
        ));
        assert!(slugs(&covered).contains(&"golden-dome"));
        assert!(covered.topics.iter().all(|t| t.matched_by != MatchedBy::Phrase));

        // Gated aliases only cover a phrase when defense context is present.
        let gated = TopicExtractor::default().extract(&article(
            "Dow Jones Industrial Average Rallies",
            "Stocks rose on Tuesday.",
        ));
        assert!(!slugs(&gated).contains(&"department-of-defense"));
        assert!(
            gated
                .topics
                .iter()
                .any(|t| t.matched_by == MatchedBy::Phrase && t.label.starts_with("Dow Jones"))
        );
    }

    #[test]
    fn official_sources_strip_noise_lines_and_imply_context() {
        let source = FeedSource {
            id: "agency-releases".into(),
            name: "Agency Releases".into(),
            category: SourceCategory::Official,
            feed_url: "https://example.gov/rss".into(),
            homepage_url: "https://example.gov".into(),
            weight: 1.0,
            quality_tier: QualityTier::Primary,
            cadence: Cadence::Daily,
            story_role: StoryRole::Guidance,
        };
        let body = "Updated Jan. 5, 2026\nWASHINGTON \u{2014}\nJan. 5, 2026\nDOW leaders met with industry.";
        let extraction = TopicExtractor::default().extract(&ArticleText {
            title: "Readout of meeting",
            summary: "",
            url: "https://example.gov/readout",
            full_text: Some(body),
            source: Some(&source),
        });
        assert!(extraction.defense_context);
        assert!(slugs(&extraction).contains(&"department-of-defense"));

        let stripped = strip_noise_lines(body);
        assert_eq!(stripped, "DOW leaders met with industry.");
    }

    #[test]
    fn registry_membership_is_a_context_signal() {
        let registry = SourceRegistry::builtin();
        let source = registry.get("defense-news").unwrap().clone();
        let input = ArticleText {
            title: "DOW leadership shuffle",
            summary: "",
            url: "https://example.com/y",
            full_text: None,
            source: Some(&source),
        };
        let extraction = TopicExtractor::default().with_registry(&registry).extract(&input);
        assert!(slugs(&extraction).contains(&"department-of-defense"));
    }

    #[test]
    fn ordering_and_cap() {
        let mut text = String::new();
        for def in crate::taxonomy::BUILTIN_TOPICS {
            text.push_str(def.aliases[0]);
            text.push_str(". ");
        }
        let extraction = TopicExtractor::default().extract(&ArticleText {
            title: "Roundup",
            summary: "",
            url: "https://example.com/z",
            full_text: Some(&text),
            source: None,
        });
        assert_eq!(extraction.topics.len(), MAX_TOPICS_PER_ARTICLE);
        assert!(
            extraction
                .topics
                .windows(2)
                .all(|w| compare_candidates(&w[0], &w[1]) != std::cmp::Ordering::Greater)
        );
    }

    #[test]
    fn capitalized_phrase_runs() {
        let phrases = capitalized_phrases("The Defense Logistics Agency, and U.S. Forces Korea met.");
        assert_eq!(phrases, vec!["Defense Logistics Agency", "U.S. Forces Korea"]);
    }
}

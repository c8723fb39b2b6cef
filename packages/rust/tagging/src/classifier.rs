//! Keyword classifier: mission, domain, and technology tags plus content
//! type, track, and a high-impact flag.

use briefwire_shared::{ArticleTags, ContentType, SourceCategory};

use crate::ArticleText;

const MAX_MISSIONS: usize = 4;
const MAX_DOMAINS: usize = 2;
const MAX_TECHNOLOGIES: usize = 5;

/// Domain used when no domain rule matched.
pub const DEFAULT_DOMAIN: &str = "multi-domain";
/// Mission used for official sources with no mission match.
pub const DEFAULT_OFFICIAL_MISSION: &str = "industrial-base";

/// A label and the substrings that vote for it.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

const fn rule(label: &'static str, keywords: &'static [&'static str]) -> KeywordRule {
    KeywordRule { label, keywords }
}

pub const MISSION_RULES: &[KeywordRule] = &[
    rule(
        "air-dominance",
        &["fighter", "air superiority", "air dominance", "ngad", "f-35", "f-47", "b-21", "bomber", "collaborative combat aircraft"],
    ),
    rule(
        "missile-defense",
        &["missile defense", "golden dome", "interceptor", "patriot", "thaad", "aegis", "air and missile defense"],
    ),
    rule(
        "space-superiority",
        &["space force", "space domain awareness", "counterspace", "orbital warfare", "satellite constellation"],
    ),
    rule(
        "maritime-power",
        &["shipbuilding", "submarine", "destroyer", "frigate", "carrier strike", "fleet"],
    ),
    rule(
        "land-forces",
        &["army", "brigade", "artillery", "armored", "howitzer", "himars", "infantry"],
    ),
    rule(
        "nuclear-deterrence",
        &["nuclear", "icbm", "sentinel", "columbia-class", "deterrence", "triad"],
    ),
    rule(
        "cyber-operations",
        &["cyber", "ransomware", "network defense", "cyber command"],
    ),
    rule(
        "command-and-control",
        &["jadc2", "command and control", "battle management", "data link"],
    ),
    rule(
        "intelligence-surveillance",
        &["surveillance", "reconnaissance", "intelligence"],
    ),
    rule(
        "logistics",
        &["logistics", "sustainment", "supply chain", "depot"],
    ),
    rule(
        "industrial-base",
        &["industrial base", "production line", "manufacturing", "munitions production", "supplier", "workforce"],
    ),
    rule(
        "allied-cooperation",
        &["nato", "aukus", "allies", "partner nations", "foreign military sales", "coalition"],
    ),
];

pub const DOMAIN_RULES: &[KeywordRule] = &[
    rule(
        "air",
        &["aircraft", "fighter", "bomber", "air force", "aviation", "airspace", "air base"],
    ),
    rule(
        "land",
        &["army", "ground vehicle", "artillery", "main battle tank", "infantry", "armored", "howitzer"],
    ),
    rule(
        "maritime",
        &["navy", "naval", "shipbuilding", "warship", "submarine", "maritime", "coast guard", "destroyer", "frigate"],
    ),
    rule(
        "space",
        &["space force", "satellite", "orbit", "launch vehicle", "space development agency", "spacecraft"],
    ),
    rule(
        "cyber",
        &["cyber", "ransomware", "hacker", "zero trust", "network security"],
    ),
];

pub const TECHNOLOGY_RULES: &[KeywordRule] = &[
    rule(
        "autonomy",
        &["autonomous", "autonomy", "drone", "uncrewed", "unmanned", "swarm"],
    ),
    rule(
        "ai",
        &["artificial intelligence", "machine learning", " ai ", "ai-enabled", "generative ai"],
    ),
    rule("hypersonics", &["hypersonic"]),
    rule(
        "directed-energy",
        &["directed energy", "laser", "high-power microwave"],
    ),
    rule(
        "space-systems",
        &["satellite", "space-based", "launch", "constellation"],
    ),
    rule("quantum", &["quantum"]),
    rule("cyber", &["cyber", "encryption", "zero trust"]),
    rule("sensors", &["radar", "sensor", "infrared", "sonar"]),
    rule(
        "munitions",
        &["munition", "missile", "warhead", "ammunition"],
    ),
    rule(
        "electronic-warfare",
        &["electronic warfare", "jamming", "jammer", "spectrum"],
    ),
    rule(
        "counter-uas",
        &["counter-drone", "counter-uas", "c-uas"],
    ),
    rule(
        "software",
        &["software", "cloud", "devsecops", "data platform"],
    ),
    rule(
        "communications",
        &["satcom", "5g", "communications", "networking"],
    ),
    rule(
        "advanced-manufacturing",
        &["additive manufacturing", "3d printing", "advanced manufacturing"],
    ),
];

/// Content type buckets in tie-break order.
const CONTENT_TYPE_RULES: &[(ContentType, &[&str])] = &[
    (
        ContentType::Conflict,
        &["war ", "strike", "attack", "invasion", "offensive", "ceasefire", "combat", "troops", "shelling", "airstrike", "conflict", "frontline"],
    ),
    (
        ContentType::Budget,
        &["budget", "appropriation", "fiscal year", "continuing resolution", "ndaa", "spending bill", "topline"],
    ),
    (
        ContentType::Policy,
        &["policy", "strategy", "executive order", "guidance", "memo", "directive", "regulation", "legislation", "doctrine", "hearing"],
    ),
    (
        ContentType::Funding,
        &["contract", "awarded", "funding", "raises", "investment", "venture", "series a", "series b", "valuation", "acquires"],
    ),
    (
        ContentType::Tech,
        &["prototype", "tested", "testing", "demonstrat", "technology", "research", "flight test", "breakthrough"],
    ),
];

const HIGH_IMPACT_KEYWORDS: &[&str] = &[
    "billion",
    "emergency",
    "nuclear",
    "invasion",
    "ceasefire",
    "executive order",
    "first-ever",
    "historic",
    "shutdown",
    "sanctions",
    "multiyear",
    "declares",
];

/// Number of keyword substring hits in `corpus`.
fn score(corpus: &str, keywords: &[&str]) -> usize {
    keywords.iter().map(|k| corpus.matches(k).count()).sum()
}

/// Labels with a positive score, score desc then label asc, top `limit`.
pub fn top_labels(corpus: &str, rules: &[KeywordRule], limit: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = rules
        .iter()
        .map(|r| (score(corpus, r.keywords), r.label))
        .filter(|(s, _)| *s > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, label)| label.to_string())
        .collect()
}

fn resolve_content_type(corpus: &str) -> ContentType {
    let mut best = (0, ContentType::Program);
    for (content_type, keywords) in CONTENT_TYPE_RULES {
        let s = score(corpus, keywords);
        // Strictly greater keeps the earlier bucket on ties.
        if s > best.0 {
            best = (s, *content_type);
        }
    }
    best.1
}

/// Classify from title, summary, URL, and source name.
pub fn classify(input: &ArticleText<'_>) -> ArticleTags {
    let source_name = input.source.map(|s| s.name.as_str()).unwrap_or_default();
    let corpus = format!(
        " {} {} {} {} ",
        input.title, input.summary, input.url, source_name
    )
    .to_lowercase();

    let mut missions = top_labels(&corpus, MISSION_RULES, MAX_MISSIONS);
    let mut domains = top_labels(&corpus, DOMAIN_RULES, MAX_DOMAINS);
    let technologies = top_labels(&corpus, TECHNOLOGY_RULES, MAX_TECHNOLOGIES);

    if domains.is_empty() {
        domains.push(DEFAULT_DOMAIN.to_string());
    }
    let official = input
        .source
        .is_some_and(|s| s.category == SourceCategory::Official);
    if missions.is_empty() && official {
        missions.push(DEFAULT_OFFICIAL_MISSION.to_string());
    }

    let content_type = resolve_content_type(&corpus);
    ArticleTags {
        missions,
        domains,
        technologies,
        content_type,
        track: content_type.track(),
        high_impact: HIGH_IMPACT_KEYWORDS.iter().any(|k| corpus.contains(k)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefwire_shared::{SourceRegistry, Track};

    fn text<'a>(title: &'a str, summary: &'a str) -> ArticleText<'a> {
        ArticleText {
            title,
            summary,
            url: "https://example.com/story",
            full_text: None,
            source: None,
        }
    }

    #[test]
    fn drone_is_technology_and_satellite_is_space() {
        let tags = classify(&text("New drone relays satellite imagery", ""));
        assert!(tags.domains.contains(&"space".to_string()));
        assert!(tags.technologies.contains(&"autonomy".to_string()));
        assert!(!tags.domains.iter().any(|d| d == "autonomy"));
    }

    #[test]
    fn official_source_defaults_to_industrial_base() {
        let registry = SourceRegistry::builtin();
        let source = registry.get("dod-releases").unwrap();
        let tags = classify(&ArticleText {
            title: "Readout of meeting with counterparts",
            summary: "",
            url: "https://www.defense.gov/News/Releases/1",
            full_text: None,
            source: Some(source),
        });
        assert_eq!(tags.missions, vec![DEFAULT_OFFICIAL_MISSION.to_string()]);
        assert_eq!(tags.domains, vec![DEFAULT_DOMAIN.to_string()]);

        let journalism = classify(&text("Readout of meeting with counterparts", ""));
        assert!(journalism.missions.is_empty());
    }

    #[test]
    fn content_type_and_track() {
        let funding = classify(&text("Startup raises $200 million in venture funding", ""));
        assert_eq!(funding.content_type, ContentType::Funding);
        assert_eq!(funding.track, Track::Capital);

        let program = classify(&text("Program office names new lead", ""));
        assert_eq!(program.content_type, ContentType::Program);
        assert_eq!(program.track, Track::Programs);
    }

    #[test]
    fn content_type_ties_follow_bucket_order() {
        // One budget hit and one policy hit: budget wins the tie.
        let tags = classify(&text("Budget memo circulates", ""));
        assert_eq!(tags.content_type, ContentType::Budget);
        assert_eq!(tags.track, Track::Macro);
    }

    #[test]
    fn top_labels_respect_limits_and_order() {
        let corpus = " army artillery infantry navy submarine satellite aircraft cyber ";
        let domains = top_labels(corpus, DOMAIN_RULES, MAX_DOMAINS);
        assert_eq!(domains, vec!["land".to_string(), "maritime".to_string()]);
    }

    #[test]
    fn high_impact_keywords() {
        assert!(classify(&text("Army signs $3 billion multiyear deal", "")).high_impact);
        assert!(!classify(&text("Army updates uniform guidance", "")).high_impact);
    }
}

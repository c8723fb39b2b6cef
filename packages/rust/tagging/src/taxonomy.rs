//! The canonical topic taxonomy.
//!
//! Each topic has a label, a type, a set of aliases, and a subset of aliases
//! that are only trusted when the article shows defense context.

use std::collections::HashMap;
use std::sync::LazyLock;

use briefwire_shared::TopicType;

use crate::normalize::tokens;

/// Static definition of one taxonomy topic.
#[derive(Debug, Clone, Copy)]
pub struct TopicDef {
    pub slug: &'static str,
    pub label: &'static str,
    pub topic_type: TopicType,
    pub aliases: &'static [&'static str],
    /// Ambiguous aliases admitted only with defense context.
    pub context_aliases: &'static [&'static str],
}

/// One alias, normalized and tokenized.
#[derive(Debug, Clone)]
pub struct CompiledAlias {
    pub tokens: Vec<String>,
    pub context_gated: bool,
}

/// A taxonomy topic with aliases ready for matching.
#[derive(Debug, Clone)]
pub struct TaxonomyTopic {
    pub slug: String,
    pub label: String,
    pub topic_type: TopicType,
    /// Longest alias first so overlapping aliases never double count.
    pub aliases: Vec<CompiledAlias>,
}

/// The full registry of canonical topics.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    topics: Vec<TaxonomyTopic>,
    by_slug: HashMap<String, usize>,
}

static BUILTIN: LazyLock<Taxonomy> = LazyLock::new(|| Taxonomy::from_defs(BUILTIN_TOPICS));

impl Taxonomy {
    /// The built-in defense taxonomy.
    pub fn builtin() -> &'static Taxonomy {
        &BUILTIN
    }

    pub fn from_defs(defs: &[TopicDef]) -> Self {
        let mut topics = Vec::with_capacity(defs.len());
        let mut by_slug = HashMap::new();

        for def in defs {
            let idx = topics.len();
            let mut aliases: Vec<CompiledAlias> = def
                .aliases
                .iter()
                .map(|a| (a, false))
                .chain(def.context_aliases.iter().map(|a| (a, true)))
                .map(|(alias, context_gated)| CompiledAlias {
                    tokens: tokens(alias),
                    context_gated,
                })
                .filter(|a| !a.tokens.is_empty())
                .collect();
            aliases.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));

            by_slug.insert(def.slug.to_string(), idx);
            topics.push(TaxonomyTopic {
                slug: def.slug.into(),
                label: def.label.into(),
                topic_type: def.topic_type,
                aliases,
            });
        }

        Self { topics, by_slug }
    }

    pub fn topics(&self) -> &[TaxonomyTopic] {
        &self.topics
    }

    pub fn get(&self, slug: &str) -> Option<&TaxonomyTopic> {
        self.by_slug.get(slug).map(|&i| &self.topics[i])
    }
}

// ---------------------------------------------------------------------------
// Built-in topics
// ---------------------------------------------------------------------------

const fn topic(
    slug: &'static str,
    label: &'static str,
    topic_type: TopicType,
    aliases: &'static [&'static str],
    context_aliases: &'static [&'static str],
) -> TopicDef {
    TopicDef {
        slug,
        label,
        topic_type,
        aliases,
        context_aliases,
    }
}

use TopicType::{Concept, Organization, Person, Platform, Program, Region, Technology};

pub const BUILTIN_TOPICS: &[TopicDef] = &[
    // Organizations
    topic(
        "department-of-defense",
        "Department of Defense",
        Organization,
        &[
            "department of defense",
            "defense department",
            "dod",
            "d.o.d.",
            "pentagon",
            "department of war",
            "war department",
        ],
        &["dow"],
    ),
    topic("us-army", "U.S. Army", Organization, &["u.s. army", "us army", "army"], &[]),
    topic("us-navy", "U.S. Navy", Organization, &["u.s. navy", "us navy", "navy"], &[]),
    topic(
        "us-air-force",
        "U.S. Air Force",
        Organization,
        &["u.s. air force", "us air force", "air force", "usaf"],
        &[],
    ),
    topic(
        "us-marine-corps",
        "U.S. Marine Corps",
        Organization,
        &["marine corps", "usmc", "marines"],
        &[],
    ),
    topic(
        "us-space-force",
        "U.S. Space Force",
        Organization,
        &["u.s. space force", "space force", "ussf"],
        &[],
    ),
    topic(
        "darpa",
        "DARPA",
        Organization,
        &["darpa", "defense advanced research projects agency"],
        &[],
    ),
    topic(
        "defense-innovation-unit",
        "Defense Innovation Unit",
        Organization,
        &["defense innovation unit"],
        &["diu"],
    ),
    topic(
        "missile-defense-agency",
        "Missile Defense Agency",
        Organization,
        &["missile defense agency"],
        &["mda"],
    ),
    topic(
        "space-development-agency",
        "Space Development Agency",
        Organization,
        &["space development agency"],
        &["sda"],
    ),
    topic(
        "nato",
        "NATO",
        Organization,
        &["nato", "north atlantic treaty organization"],
        &[],
    ),
    topic(
        "congress",
        "Congress",
        Organization,
        &[
            "congress",
            "senate armed services committee",
            "house armed services committee",
            "sasc",
            "hasc",
        ],
        &[],
    ),
    topic("lockheed-martin", "Lockheed Martin", Organization, &["lockheed martin", "lockheed"], &[]),
    topic("rtx", "RTX", Organization, &["rtx", "raytheon"], &[]),
    topic("northrop-grumman", "Northrop Grumman", Organization, &["northrop grumman", "northrop"], &[]),
    topic("general-dynamics", "General Dynamics", Organization, &["general dynamics"], &[]),
    topic("boeing", "Boeing", Organization, &["boeing"], &[]),
    topic("l3harris", "L3Harris", Organization, &["l3harris", "l3harris technologies"], &[]),
    topic("bae-systems", "BAE Systems", Organization, &["bae systems"], &[]),
    topic("anduril", "Anduril Industries", Organization, &["anduril industries", "anduril"], &[]),
    topic("palantir", "Palantir", Organization, &["palantir"], &[]),
    topic("spacex", "SpaceX", Organization, &["spacex"], &[]),
    // Platforms and programs
    topic(
        "f-35",
        "F-35 Lightning II",
        Platform,
        &["f-35", "f-35a", "f-35b", "f-35c", "joint strike fighter", "lightning ii"],
        &[],
    ),
    topic("b-21", "B-21 Raider", Platform, &["b-21 raider", "b-21"], &[]),
    topic(
        "ngad",
        "Next Generation Air Dominance",
        Program,
        &["next generation air dominance", "ngad", "f-47"],
        &[],
    ),
    topic(
        "collaborative-combat-aircraft",
        "Collaborative Combat Aircraft",
        Program,
        &["collaborative combat aircraft"],
        &["cca"],
    ),
    topic("golden-dome", "Golden Dome", Program, &["golden dome"], &[]),
    topic(
        "sentinel-icbm",
        "Sentinel ICBM",
        Program,
        &["sentinel icbm", "lgm-35a"],
        &["sentinel"],
    ),
    topic(
        "columbia-class",
        "Columbia-class submarine",
        Platform,
        &["columbia-class", "columbia class"],
        &[],
    ),
    topic(
        "virginia-class",
        "Virginia-class submarine",
        Platform,
        &["virginia-class", "virginia class"],
        &[],
    ),
    topic("aukus", "AUKUS", Program, &["aukus"], &[]),
    topic(
        "replicator",
        "Replicator initiative",
        Program,
        &["replicator initiative"],
        &["replicator"],
    ),
    topic(
        "jadc2",
        "JADC2",
        Program,
        &[
            "jadc2",
            "joint all-domain command and control",
            "joint all domain command and control",
        ],
        &[],
    ),
    topic("himars", "HIMARS", Platform, &["himars"], &[]),
    topic(
        "patriot",
        "Patriot air defense system",
        Platform,
        &["patriot missile", "patriot air defense", "patriot battery", "patriot system"],
        &["patriot"],
    ),
    topic("abrams", "M1 Abrams", Platform, &["m1 abrams", "abrams"], &[]),
    // Technologies
    topic(
        "hypersonic-weapons",
        "Hypersonic weapons",
        Technology,
        &["hypersonic weapons", "hypersonic missile", "hypersonic", "hypersonics"],
        &[],
    ),
    topic(
        "artificial-intelligence",
        "Artificial intelligence",
        Technology,
        &["artificial intelligence", "machine learning"],
        &["ai"],
    ),
    topic(
        "uncrewed-systems",
        "Uncrewed systems",
        Technology,
        &["drone", "drones", "uncrewed", "unmanned", "uas", "uav", "uavs"],
        &[],
    ),
    topic(
        "counter-drone",
        "Counter-drone systems",
        Technology,
        &["counter-drone", "counter-uas", "c-uas"],
        &[],
    ),
    topic(
        "directed-energy",
        "Directed energy",
        Technology,
        &["directed energy", "high-energy laser", "high energy laser", "high-power microwave"],
        &[],
    ),
    topic("quantum", "Quantum technology", Technology, &["quantum"], &[]),
    topic("cybersecurity", "Cybersecurity", Technology, &["cybersecurity", "cyber"], &[]),
    topic(
        "electronic-warfare",
        "Electronic warfare",
        Technology,
        &["electronic warfare"],
        &["ew"],
    ),
    topic("munitions", "Munitions", Technology, &["munitions", "155mm", "artillery shells"], &[]),
    // Regions
    topic("ukraine", "Ukraine", Region, &["ukraine", "ukrainian", "kyiv"], &[]),
    topic("russia", "Russia", Region, &["russia", "russian", "moscow", "kremlin"], &[]),
    topic(
        "china",
        "China",
        Region,
        &["china", "chinese", "beijing", "people's liberation army"],
        &["pla"],
    ),
    topic("taiwan", "Taiwan", Region, &["taiwan", "taiwanese"], &[]),
    topic("israel", "Israel", Region, &["israel", "israeli"], &[]),
    topic("iran", "Iran", Region, &["iran", "iranian", "tehran"], &[]),
    topic("indo-pacific", "Indo-Pacific", Region, &["indo-pacific", "indopacom"], &[]),
    topic("middle-east", "Middle East", Region, &["middle east"], &[]),
    topic(
        "north-korea",
        "North Korea",
        Region,
        &["north korea", "north korean", "pyongyang", "dprk"],
        &[],
    ),
    topic("red-sea", "Red Sea", Region, &["red sea", "houthi", "houthis"], &[]),
    topic("arctic", "Arctic", Region, &["arctic"], &[]),
    // Concepts
    topic(
        "defense-budget",
        "Defense budget",
        Concept,
        &[
            "defense budget",
            "budget request",
            "appropriations",
            "ndaa",
            "national defense authorization act",
            "continuing resolution",
        ],
        &[],
    ),
    topic(
        "acquisition-reform",
        "Acquisition reform",
        Concept,
        &[
            "acquisition reform",
            "software acquisition pathway",
            "other transaction authority",
        ],
        &["ota"],
    ),
    topic(
        "defense-industrial-base",
        "Defense industrial base",
        Concept,
        &["defense industrial base", "industrial base"],
        &[],
    ),
    topic(
        "export-controls",
        "Export controls",
        Concept,
        &["export controls", "export control", "itar", "foreign military sales"],
        &[],
    ),
    topic(
        "nuclear-deterrence",
        "Nuclear deterrence",
        Concept,
        &["nuclear deterrence", "nuclear triad", "nuclear modernization"],
        &[],
    ),
    // People
    topic(
        "secretary-of-defense",
        "Secretary of Defense",
        Person,
        &[
            "secretary of defense",
            "defense secretary",
            "secretary of war",
            "war secretary",
            "secdef",
        ],
        &[],
    ),
];

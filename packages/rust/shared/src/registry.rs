//! Source registry: the immutable feed catalog.
//!
//! Built once at startup (from the built-in catalog or an operator TOML file)
//! and passed by reference into every component that needs source metadata.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{BriefwireError, Result};
use crate::types::{Cadence, FeedSource, QualityTier, SourceCategory, StoryRole};

/// Weight used for sources the registry does not know about.
pub const DEFAULT_SOURCE_WEIGHT: f64 = 1.0;

/// Upper bound accepted for a catalog weight.
const MAX_SOURCE_WEIGHT: f64 = 10.0;

/// Immutable catalog of feed sources with O(1) lookup by id.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<FeedSource>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sources: Vec<FeedSource>,
}

impl SourceRegistry {
    /// Build a registry from explicit sources, validating every entry.
    pub fn new(sources: Vec<FeedSource>) -> Result<Self> {
        let mut index = HashMap::with_capacity(sources.len());
        for (i, source) in sources.iter().enumerate() {
            validate_source(source)?;
            if index.insert(source.id.clone(), i).is_some() {
                return Err(BriefwireError::validation(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
        }
        Ok(Self { sources, index })
    }

    /// Parse a `[[sources]]` TOML catalog.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| BriefwireError::config(format!("invalid source catalog: {e}")))?;
        if file.sources.is_empty() {
            return Err(BriefwireError::config("source catalog has no sources"));
        }
        Self::new(file.sources)
    }

    /// The curated default catalog.
    pub fn builtin() -> Self {
        let sources = builtin_sources();
        let index = sources
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { sources, index }
    }

    pub fn get(&self, id: &str) -> Option<&FeedSource> {
        self.index.get(id).map(|&i| &self.sources[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ranking weight for `id`, or [`DEFAULT_SOURCE_WEIGHT`] if unknown.
    pub fn weight_for(&self, id: &str) -> f64 {
        self.get(id)
            .map(|s| s.weight)
            .unwrap_or(DEFAULT_SOURCE_WEIGHT)
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Select a subset by id, preserving the requested order.
    /// An empty selection means "all sources".
    pub fn select(&self, ids: &[String]) -> Result<Vec<FeedSource>> {
        if ids.is_empty() {
            return Ok(self.sources.clone());
        }
        ids.iter()
            .map(|id| {
                self.get(id)
                    .cloned()
                    .ok_or_else(|| BriefwireError::validation(format!("unknown source '{id}'")))
            })
            .collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Load a source catalog from a TOML file.
pub fn load_sources_from(path: &Path) -> Result<SourceRegistry> {
    let content = std::fs::read_to_string(path).map_err(|e| BriefwireError::io(path, e))?;
    SourceRegistry::from_toml_str(&content).map_err(|e| match e {
        BriefwireError::Config { message } => {
            BriefwireError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

fn validate_source(source: &FeedSource) -> Result<()> {
    if source.id.trim().is_empty() {
        return Err(BriefwireError::validation("source id must not be empty"));
    }
    if source.name.trim().is_empty() {
        return Err(BriefwireError::validation(format!(
            "source '{}' has no name",
            source.id
        )));
    }
    let url = Url::parse(&source.feed_url).map_err(|e| {
        BriefwireError::validation(format!(
            "source '{}' has invalid feed URL '{}': {e}",
            source.id, source.feed_url
        ))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(BriefwireError::validation(format!(
            "source '{}' feed URL must be http(s)",
            source.id
        )));
    }
    if !(0.0..=MAX_SOURCE_WEIGHT).contains(&source.weight) {
        return Err(BriefwireError::validation(format!(
            "source '{}' weight {} out of range 0..={MAX_SOURCE_WEIGHT}",
            source.id, source.weight
        )));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn source(
    id: &str,
    name: &str,
    category: SourceCategory,
    feed_url: &str,
    homepage_url: &str,
    weight: f64,
    quality_tier: QualityTier,
    cadence: Cadence,
    story_role: StoryRole,
) -> FeedSource {
    FeedSource {
        id: id.into(),
        name: name.into(),
        category,
        feed_url: feed_url.into(),
        homepage_url: homepage_url.into(),
        weight,
        quality_tier,
        cadence,
        story_role,
    }
}

fn builtin_sources() -> Vec<FeedSource> {
    use Cadence::*;
    use QualityTier::*;
    use SourceCategory::*;

    vec![
        // Trade and general defense journalism
        source(
            "breaking-defense",
            "Breaking Defense",
            Journalism,
            "https://breakingdefense.com/feed/",
            "https://breakingdefense.com",
            1.7,
            Primary,
            Breaking,
            StoryRole::News,
        ),
        source(
            "defense-news",
            "Defense News",
            Journalism,
            "https://www.defensenews.com/arc/outboundfeeds/rss/?outputType=xml",
            "https://www.defensenews.com",
            1.6,
            Primary,
            Breaking,
            StoryRole::News,
        ),
        source(
            "defensescoop",
            "DefenseScoop",
            Journalism,
            "https://defensescoop.com/feed/",
            "https://defensescoop.com",
            1.6,
            Primary,
            Daily,
            StoryRole::News,
        ),
        source(
            "defense-one",
            "Defense One",
            Journalism,
            "https://www.defenseone.com/rss/all/",
            "https://www.defenseone.com",
            1.5,
            Primary,
            Daily,
            StoryRole::News,
        ),
        source(
            "the-war-zone",
            "The War Zone",
            Journalism,
            "https://www.twz.com/feed",
            "https://www.twz.com",
            1.4,
            Secondary,
            Breaking,
            StoryRole::News,
        ),
        source(
            "c4isrnet",
            "C4ISRNET",
            Journalism,
            "https://www.c4isrnet.com/arc/outboundfeeds/rss/?outputType=xml",
            "https://www.c4isrnet.com",
            1.3,
            Secondary,
            Daily,
            StoryRole::News,
        ),
        source(
            "air-space-forces",
            "Air & Space Forces Magazine",
            Journalism,
            "https://www.airandspaceforces.com/feed/",
            "https://www.airandspaceforces.com",
            1.3,
            Secondary,
            Daily,
            StoryRole::News,
        ),
        source(
            "spacenews-military",
            "SpaceNews Military",
            Journalism,
            "https://spacenews.com/section/military/feed/",
            "https://spacenews.com",
            1.3,
            Secondary,
            Daily,
            StoryRole::News,
        ),
        source(
            "naval-news",
            "Naval News",
            Journalism,
            "https://www.navalnews.com/feed/",
            "https://www.navalnews.com",
            1.2,
            Secondary,
            Daily,
            StoryRole::News,
        ),
        // Official releases and guidance
        source(
            "dod-releases",
            "Department of Defense Releases",
            Official,
            "https://www.defense.gov/DesktopModules/ArticleCS/RSS.ashx?ContentType=9&Site=945&max=10",
            "https://www.defense.gov",
            1.8,
            Primary,
            Daily,
            StoryRole::Guidance,
        ),
        source(
            "dod-news",
            "DOD News",
            Official,
            "https://www.defense.gov/DesktopModules/ArticleCS/RSS.ashx?ContentType=1&Site=945&max=10",
            "https://www.defense.gov",
            1.5,
            Primary,
            Daily,
            StoryRole::News,
        ),
        source(
            "dod-contracts",
            "DOD Contract Announcements",
            Official,
            "https://www.defense.gov/DesktopModules/ArticleCS/RSS.ashx?ContentType=400&Site=945&max=10",
            "https://www.defense.gov",
            1.4,
            Primary,
            Daily,
            StoryRole::Guidance,
        ),
        source(
            "army-news",
            "U.S. Army News",
            Official,
            "https://www.army.mil/rss/static/143.xml",
            "https://www.army.mil",
            1.1,
            Secondary,
            Daily,
            StoryRole::News,
        ),
        source(
            "darpa-news",
            "DARPA News",
            Official,
            "https://www.darpa.mil/rss.xml",
            "https://www.darpa.mil",
            1.2,
            Secondary,
            Weekly,
            StoryRole::Guidance,
        ),
        source(
            "diu-news",
            "Defense Innovation Unit",
            Official,
            "https://www.diu.mil/latest/rss.xml",
            "https://www.diu.mil",
            1.2,
            Secondary,
            Weekly,
            StoryRole::Guidance,
        ),
        source(
            "space-force-news",
            "U.S. Space Force News",
            Official,
            "https://www.spaceforce.mil/DesktopModules/ArticleCS/RSS.ashx?ContentType=1&Site=1060&max=10",
            "https://www.spaceforce.mil",
            1.1,
            Secondary,
            Daily,
            StoryRole::News,
        ),
        // Analysis and commentary
        source(
            "war-on-the-rocks",
            "War on the Rocks",
            Analysis,
            "https://warontherocks.com/feed/",
            "https://warontherocks.com",
            1.0,
            Secondary,
            Weekly,
            StoryRole::Analysis,
        ),
        source(
            "cset",
            "CSET Georgetown",
            Analysis,
            "https://cset.georgetown.edu/feed/",
            "https://cset.georgetown.edu",
            0.9,
            Supplemental,
            Weekly,
            StoryRole::Analysis,
        ),
        source(
            "csis-defense",
            "CSIS Defense and Security",
            Analysis,
            "https://www.csis.org/programs/defense-and-security/rss.xml",
            "https://www.csis.org",
            0.9,
            Supplemental,
            Weekly,
            StoryRole::Analysis,
        ),
    ]
}

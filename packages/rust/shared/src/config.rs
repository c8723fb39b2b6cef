//! Application configuration for Briefwire.
//!
//! User config lives at `~/.briefwire/briefwire.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BriefwireError, Result};
use crate::registry::{SourceRegistry, load_sources_from};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "briefwire.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".briefwire";

// ---------------------------------------------------------------------------
// Config structs (matching briefwire.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Feed ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Article content extraction settings.
    #[serde(default)]
    pub content: ContentConfig,

    /// Classification and topic enrichment settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Optional operator source catalog. The built-in catalog is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_file: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            sources_file: None,
        }
    }
}

fn default_database_path() -> String {
    "~/.briefwire/briefwire.db".into()
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Items kept per source after sorting by publish time.
    #[serde(default = "default_max_per_source")]
    pub max_per_source: usize,

    /// Overall cap on ranked items per run.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Recency window; dated items older than this are dropped.
    #[serde(default = "default_since_hours")]
    pub since_hours: u32,

    /// Per-feed request timeout.
    #[serde(default = "default_ingest_timeout")]
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_per_source: default_max_per_source(),
            limit: default_limit(),
            since_hours: default_since_hours(),
            timeout_secs: default_ingest_timeout(),
        }
    }
}

fn default_max_per_source() -> usize {
    12
}
fn default_limit() -> usize {
    200
}
fn default_since_hours() -> u32 {
    72
}
fn default_ingest_timeout() -> u64 {
    15
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Worker pool size.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Articles taken per batch.
    #[serde(default = "default_content_batch")]
    pub batch_size: usize,

    /// Per-page request timeout.
    #[serde(default = "default_content_timeout")]
    pub timeout_secs: u64,

    /// Override for the HTTP user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_content_batch(),
            timeout_secs: default_content_timeout(),
            user_agent: None,
        }
    }
}

fn default_concurrency() -> usize {
    5
}
fn default_content_batch() -> usize {
    50
}
fn default_content_timeout() -> u64 {
    20
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_enrich_batch")]
    pub batch_size: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_enrich_batch(),
        }
    }
}

fn default_enrich_batch() -> usize {
    100
}

// ---------------------------------------------------------------------------
// Runtime options (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime ingest options.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_per_source: usize,
    pub limit: usize,
    pub since_hours: u32,
    pub timeout: Duration,
    /// Restrict the run to these source ids. Empty means all.
    pub source_ids: Vec<String>,
}

impl From<&AppConfig> for IngestOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_per_source: config.ingest.max_per_source,
            limit: config.ingest.limit,
            since_hours: config.ingest.since_hours,
            timeout: Duration::from_secs(config.ingest.timeout_secs),
            source_ids: Vec::new(),
        }
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime content-extraction options.
#[derive(Debug, Clone)]
pub struct ContentOptions {
    pub concurrency: usize,
    pub batch_size: usize,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl From<&AppConfig> for ContentOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.content.concurrency.max(1),
            batch_size: config.content.batch_size,
            timeout: Duration::from_secs(config.content.timeout_secs),
            user_agent: config.content.user_agent.clone(),
        }
    }
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime enrichment options.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub concurrency: usize,
    pub batch_size: usize,
    /// Re-tag articles that already carry topic links.
    pub refresh: bool,
}

impl From<&AppConfig> for EnrichOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.enrichment.concurrency.max(1),
            batch_size: config.enrichment.batch_size,
            refresh: false,
        }
    }
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl AppConfig {
    /// Resolved database path with `~` expanded.
    pub fn database_path(&self) -> Result<PathBuf> {
        expand_home(&self.defaults.database_path)
    }

    /// The configured source catalog, or the built-in one.
    pub fn source_registry(&self) -> Result<SourceRegistry> {
        match &self.defaults.sources_file {
            Some(file) => load_sources_from(&expand_home(file)?),
            None => Ok(SourceRegistry::builtin()),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| BriefwireError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.briefwire/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BriefwireError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.briefwire/briefwire.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BriefwireError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BriefwireError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Render a config as pretty TOML.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| BriefwireError::config(e.to_string()))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BriefwireError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = render_config(&AppConfig::default())?;

    std::fs::write(&path, content).map_err(|e| BriefwireError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use briefwire_core::{
    PipelineOptions, ProgressReporter, run_content_batch, run_enrichment_batch, run_ingest,
    run_pipeline,
};
use briefwire_feeds::canonicalize_url;
use briefwire_shared::{
    AppConfig, ContentOptions, EnrichOptions, EnrichmentBatchResult, IngestOptions, init_config,
    load_config, render_config,
};
use briefwire_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Briefwire: defense-news ingestion and knowledge extraction.
#[derive(Parser)]
#[command(
    name = "briefwire",
    version,
    about = "Pull defense and national-security news feeds, extract article text, and tag topics.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides the config file).
    #[arg(long, global = true, env = "BRIEFWIRE_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Flags shared by `ingest` and `run`.
#[derive(Args, Debug, Default)]
pub(crate) struct IngestArgs {
    /// Source ids to fetch (comma-separated). Defaults to the whole catalog.
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Maximum articles kept after ranking.
    #[arg(long)]
    limit: Option<usize>,

    /// Maximum items taken from each feed.
    #[arg(long)]
    max_per_source: Option<usize>,

    /// Drop items published longer ago than this.
    #[arg(long)]
    since_hours: Option<u32>,
}

impl IngestArgs {
    fn apply(self, options: &mut IngestOptions) {
        options.source_ids = self.sources;
        if let Some(limit) = self.limit {
            options.limit = limit;
        }
        if let Some(max) = self.max_per_source {
            options.max_per_source = max;
        }
        if let Some(hours) = self.since_hours {
            options.since_hours = hours;
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch feeds, rank items, and store new articles.
    Ingest {
        #[command(flatten)]
        args: IngestArgs,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fetch and extract full text for pending articles.
    Extract {
        /// Articles to process in this batch.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Concurrent fetches.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print the batch result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify and topic-tag stored articles.
    Enrich {
        /// Re-tag articles that were already enriched.
        #[arg(long)]
        refresh: bool,

        /// Articles to process in this batch.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Print the batch result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run ingest, extraction, and enrichment in sequence.
    Run {
        #[command(flatten)]
        args: IngestArgs,
    },

    /// List the configured source catalog.
    Sources,

    /// Show the topics linked to an article.
    Topics {
        /// Article URL (canonicalized before lookup).
        #[arg(long)]
        url: String,

        /// Print topics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete topics that no article links to.
    Prune,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "briefwire=info",
        1 => "briefwire=debug",
        _ => "briefwire=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so stdout stays clean for reports.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Ingest { args, json } => cmd_ingest(db, args, json).await,
        Command::Extract {
            batch_size,
            concurrency,
            json,
        } => cmd_extract(db, batch_size, concurrency, json).await,
        Command::Enrich {
            refresh,
            batch_size,
            json,
        } => cmd_enrich(db, refresh, batch_size, json).await,
        Command::Run { args } => cmd_run(db, args).await,
        Command::Sources => cmd_sources(),
        Command::Topics { url, json } => cmd_topics(db, &url, json).await,
        Command::Prune => cmd_prune(db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Open the database named by `--db`, or the configured one.
async fn open_storage(config: &AppConfig, db: Option<PathBuf>) -> Result<Arc<Storage>> {
    let path = match db {
        Some(path) => path,
        None => config.database_path()?,
    };
    info!(path = %path.display(), "opening database");
    Ok(Arc::new(Storage::open(&path).await?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_batch(label: &str, result: &EnrichmentBatchResult) {
    println!();
    println!("  {label}");
    println!("  Processed: {}", result.processed);
    println!("  Succeeded: {}", result.succeeded);
    println!("  Failed:    {}", result.failed);
    if result.used_legacy_fallback {
        println!("  Note:      tag columns missing, tags were not written");
    }
    for error in result.errors.iter().take(10) {
        println!("    - {}: {}", error.item_id, error.message);
    }
    if result.errors.len() > 10 {
        println!("    ... and {} more", result.errors.len() - 10);
    }
    println!();
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

async fn cmd_ingest(db: Option<PathBuf>, args: IngestArgs, json: bool) -> Result<()> {
    let config = load_config()?;
    let registry = config.source_registry()?;
    let storage = open_storage(&config, db).await?;

    let mut options = IngestOptions::from(&config);
    args.apply(&mut options);

    let reporter = CliProgress::new();
    let report = run_ingest(&options, &registry, &storage, &reporter).await?;
    reporter.finish();

    if json {
        return print_json(&report);
    }

    println!();
    println!("  Ingest complete");
    println!("  Run:      {}", report.run_id);
    println!(
        "  Sources:  {}/{} ok",
        report.sources_ok, report.sources_attempted
    );
    println!("  Fetched:  {}", report.items_fetched);
    println!("  Ranked:   {}", report.items_ranked);
    println!("  Written:  {}", report.articles_written);
    if report.used_legacy_fallback {
        println!("  Note:     tag columns missing, wrote legacy rows");
    }
    for error in &report.source_errors {
        println!("    - {}: {}", error.item_id, error.message);
    }
    println!("  Time:     {:.1}s", report.duration_ms as f64 / 1000.0);
    println!();
    Ok(())
}

async fn cmd_extract(
    db: Option<PathBuf>,
    batch_size: Option<usize>,
    concurrency: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;

    let mut options = ContentOptions::from(&config);
    if let Some(size) = batch_size {
        options.batch_size = size;
    }
    if let Some(n) = concurrency {
        options.concurrency = n;
    }

    let reporter = CliProgress::new();
    let result = run_content_batch(storage, &options, &reporter).await?;
    reporter.finish();

    if json {
        return print_json(&result);
    }
    print_batch("Content extraction complete", &result);
    Ok(())
}

async fn cmd_enrich(
    db: Option<PathBuf>,
    refresh: bool,
    batch_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let registry = Arc::new(config.source_registry()?);
    let storage = open_storage(&config, db).await?;

    let mut options = EnrichOptions::from(&config);
    options.refresh = refresh;
    if let Some(size) = batch_size {
        options.batch_size = size;
    }

    let reporter = CliProgress::new();
    let result = run_enrichment_batch(storage, registry, &options, &reporter).await?;
    reporter.finish();

    if json {
        return print_json(&result);
    }
    print_batch("Enrichment complete", &result);
    Ok(())
}

async fn cmd_run(db: Option<PathBuf>, args: IngestArgs) -> Result<()> {
    let config = load_config()?;
    let registry = Arc::new(config.source_registry()?);
    let storage = open_storage(&config, db).await?;

    let mut options = PipelineOptions::from(&config);
    args.apply(&mut options.ingest);

    let reporter = CliProgress::new();
    let report = run_pipeline(&options, registry, storage, &reporter).await?;
    reporter.finish();

    println!();
    println!("  Pipeline complete");
    println!(
        "  Sources:   {}/{} ok",
        report.ingest.sources_ok, report.ingest.sources_attempted
    );
    println!("  Articles:  {}", report.ingest.articles_written);
    println!(
        "  Extracted: {}/{}",
        report.content.succeeded, report.content.processed
    );
    println!(
        "  Tagged:    {}/{}",
        report.enrichment.succeeded, report.enrichment.processed
    );
    if report.ingest.used_legacy_fallback || report.enrichment.used_legacy_fallback {
        println!("  Note:      tag columns missing, wrote legacy rows");
    }
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Inspection commands
// ---------------------------------------------------------------------------

fn cmd_sources() -> Result<()> {
    let config = load_config()?;
    let registry = config.source_registry()?;

    println!(
        "{:<28} {:<14} {:>6}  {:<10} FEED",
        "ID", "CATEGORY", "WEIGHT", "TIER"
    );
    for source in registry.iter() {
        println!(
            "{:<28} {:<14} {:>6.2}  {:<10} {}",
            source.id,
            format!("{:?}", source.category).to_lowercase(),
            source.weight,
            format!("{:?}", source.quality_tier).to_lowercase(),
            source.feed_url
        );
    }
    println!("\n{} sources", registry.len());
    Ok(())
}

async fn cmd_topics(db: Option<PathBuf>, url: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    let path = match db {
        Some(path) => path,
        None => config.database_path()?,
    };
    let storage = Storage::open_readonly(&path).await?;

    let canonical = canonicalize_url(url, None).ok_or_else(|| eyre!("invalid URL '{url}'"))?;
    let article = storage
        .get_article_by_url(&canonical)
        .await?
        .ok_or_else(|| eyre!("no stored article for '{canonical}'"))?;
    let topics = storage.topics_for_article(&article.id).await?;

    if json {
        let rows: Vec<_> = topics
            .iter()
            .map(|t| {
                serde_json::json!({
                    "slug": t.topic.slug,
                    "label": t.topic.label,
                    "type": t.topic.topic_type.as_str(),
                    "confidence": t.link.confidence,
                    "occurrences": t.link.occurrences,
                    "is_primary": t.link.is_primary,
                })
            })
            .collect();
        return print_json(&rows);
    }

    println!("{}", article.title);
    println!("{}", article.url);
    println!();
    if topics.is_empty() {
        println!("  (no topics linked; run `briefwire enrich`)");
        return Ok(());
    }
    for linked in &topics {
        let marker = if linked.link.is_primary { "*" } else { " " };
        println!(
            " {marker} {:<32} {:<13} {:.2}  x{}",
            linked.topic.label,
            linked.topic.topic_type.as_str(),
            linked.link.confidence,
            linked.link.occurrences
        );
    }
    Ok(())
}

async fn cmd_prune(db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let removed = storage.prune_orphan_topics().await?;
    println!("Pruned {removed} orphan topics");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_done(&self, stage: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("{stage} [{current}/{total}]"));
    }

    fn done(&self, summary: &str) {
        self.spinner.println(format!("  {summary}"));
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("{}", render_config(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_flags_override_config() {
        let cli = Cli::try_parse_from([
            "briefwire",
            "ingest",
            "--sources",
            "defense-news,breaking-defense",
            "--limit",
            "25",
            "--since-hours",
            "24",
        ])
        .unwrap();
        let Command::Ingest { args, json } = cli.command else {
            panic!("expected ingest");
        };
        assert!(!json);

        let mut options = IngestOptions::default();
        let max_before = options.max_per_source;
        args.apply(&mut options);
        assert_eq!(options.source_ids, vec!["defense-news", "breaking-defense"]);
        assert_eq!(options.limit, 25);
        assert_eq!(options.since_hours, 24);
        assert_eq!(options.max_per_source, max_before);
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "briefwire",
            "topics",
            "--url",
            "https://example.com/a",
            "--db",
            "/tmp/bw.db",
            "-vv",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/bw.db")));
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}

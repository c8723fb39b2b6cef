//! End-to-end `run` pipeline: ingest → content extraction → enrichment.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use briefwire_shared::{
    AppConfig, ContentOptions, EnrichOptions, EnrichmentBatchResult, IngestOptions, Result,
    SourceRegistry,
};
use briefwire_storage::Storage;

use crate::enrichment::{run_content_batch, run_enrichment_batch};
use crate::ingest::{IngestReport, run_ingest};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each item of a batch stage finishes.
    fn item_done(&self, stage: &str, current: usize, total: usize);
    /// Called when a stage completes, with a one-line summary.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_done(&self, _stage: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &str) {}
}

/// Options for all three stages.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub ingest: IngestOptions,
    pub content: ContentOptions,
    pub enrich: EnrichOptions,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            ingest: IngestOptions::from(config),
            content: ContentOptions::from(config),
            enrich: EnrichOptions::from(config),
        }
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub ingest: IngestReport,
    pub content: EnrichmentBatchResult,
    pub enrichment: EnrichmentBatchResult,
    pub elapsed: Duration,
}

/// Run ingest, one content batch, and one enrichment batch.
///
/// Stage errors (storage failures, a bad source selection) abort the run;
/// per-item failures are only counted.
#[instrument(skip_all, fields(sources = registry.len()))]
pub async fn run_pipeline(
    options: &PipelineOptions,
    registry: Arc<SourceRegistry>,
    storage: Arc<Storage>,
    progress: &dyn ProgressReporter,
) -> Result<PipelineReport> {
    let start = Instant::now();

    let ingest = run_ingest(&options.ingest, &registry, &storage, progress).await?;
    let content = run_content_batch(Arc::clone(&storage), &options.content, progress).await?;
    let enrichment =
        run_enrichment_batch(storage, Arc::clone(&registry), &options.enrich, progress).await?;

    let elapsed = start.elapsed();
    info!(
        articles = ingest.articles_written,
        content_ok = content.succeeded,
        content_failed = content.failed,
        tagged = enrichment.succeeded,
        elapsed_ms = elapsed.as_millis(),
        "pipeline completed"
    );
    Ok(PipelineReport {
        ingest,
        content,
        enrichment,
        elapsed,
    })
}

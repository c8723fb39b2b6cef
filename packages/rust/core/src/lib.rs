//! Pipeline orchestration for Briefwire.
//!
//! This crate ties together feed fetching, ranking, content extraction,
//! tagging, and storage into the `ingest`, `extract`, `enrich`, and `run`
//! workflows.

pub mod enrichment;
pub mod ingest;
pub mod pipeline;

pub use enrichment::{
    CONTENT_STAGE, ENRICHMENT_STAGE, enrich_article, run_content_batch, run_enrichment_batch,
    run_pool, tag_article,
};
pub use ingest::{IngestReport, run_ingest, to_article};
pub use pipeline::{PipelineOptions, PipelineReport, ProgressReporter, SilentProgress, run_pipeline};

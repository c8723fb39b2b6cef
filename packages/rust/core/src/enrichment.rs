//! Batch stages over stored articles: content extraction and tagging.
//!
//! Both stages share one worker pool. A fixed number of tokio tasks pull
//! items from an `Arc<Mutex<VecDeque<_>>>` queue; each worker finishes and
//! persists an item before taking the next. Outcomes flow back over a
//! channel so the caller can count them and report progress. One item's
//! failure never stops the batch.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

use briefwire_extractor::ContentExtractor;
use briefwire_shared::{
    ArticleTags, BriefwireError, ContentOptions, EnrichOptions, EnrichmentBatchResult,
    ExtractionStatus, PersistedArticle, Result, SourceRegistry, TopicCandidate,
};
use briefwire_storage::{ArticleForEnrichment, Storage, UpsertOutcome};
use briefwire_tagging::{ArticleText, Taxonomy, TopicExtractor, classify};

use crate::pipeline::ProgressReporter;

pub const CONTENT_STAGE: &str = "content";
pub const ENRICHMENT_STAGE: &str = "enrichment";

/// Slack on top of the request timeout before an item is abandoned.
const ITEM_GRACE: Duration = Duration::from_secs(5);

/// Per-item budget for tagging, which does no network I/O.
const TAGGING_BUDGET: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Worker pool
// ---------------------------------------------------------------------------

type Outcome = (String, std::result::Result<(), String>);

/// Run `work` over `items` with at most `concurrency` workers.
///
/// Items are `(id, payload)` pairs; the id labels failures. Every item
/// is bounded by `budget`.
pub async fn run_pool<T, F, Fut>(
    stage: &str,
    items: Vec<(String, T)>,
    concurrency: usize,
    budget: Duration,
    progress: &dyn ProgressReporter,
    work: F,
) -> EnrichmentBatchResult
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let total = items.len();
    let mut result = EnrichmentBatchResult::new(stage);
    if total == 0 {
        return result;
    }

    let queue = Arc::new(Mutex::new(items.into_iter().collect::<VecDeque<_>>()));
    let work = Arc::new(work);
    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();

    let workers = concurrency.clamp(1, total);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let work = Arc::clone(&work);
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let next = queue.lock().await.pop_front();
                let Some((id, item)) = next else {
                    break;
                };
                let outcome = match tokio::time::timeout(budget, work(item)).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("timed out after {}s", budget.as_secs())),
                };
                if tx.send((id, outcome)).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    while let Some((id, outcome)) = rx.recv().await {
        match outcome {
            Ok(()) => result.record_success(),
            Err(message) => {
                warn!(stage, item = %id, error = %message, "item failed");
                result.record_failure(id, message);
            }
        }
        progress.item_done(stage, result.processed, total);
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(stage, error = %e, "worker task panicked");
            result.record_failure("worker", e.to_string());
        }
    }

    info!(
        stage,
        processed = result.processed,
        succeeded = result.succeeded,
        failed = result.failed,
        "batch completed"
    );
    result
}

// ---------------------------------------------------------------------------
// Content stage
// ---------------------------------------------------------------------------

/// Extract content for up to `batch_size` pending articles.
#[instrument(skip_all, fields(concurrency = options.concurrency, batch_size = options.batch_size))]
pub async fn run_content_batch(
    storage: Arc<Storage>,
    options: &ContentOptions,
    progress: &dyn ProgressReporter,
) -> Result<EnrichmentBatchResult> {
    let extractor = Arc::new(ContentExtractor::new(
        options.timeout,
        options.user_agent.as_deref(),
    )?);
    let articles = storage
        .list_articles_needing_content(options.batch_size as u32)
        .await?;
    progress.phase("Extracting article content");

    let items = articles.into_iter().map(|a| (a.id.clone(), a)).collect();
    let result = run_pool(
        CONTENT_STAGE,
        items,
        options.concurrency,
        options.timeout + ITEM_GRACE,
        progress,
        move |article: PersistedArticle| {
            let storage = Arc::clone(&storage);
            let extractor = Arc::clone(&extractor);
            async move {
                let content = extractor.extract(&article.url).await;
                storage.save_content(&article.id, &content).await?;
                debug!(
                    article = %article.id,
                    words = content.word_count,
                    hash = content.content_hash.as_deref().unwrap_or("-"),
                    "content saved"
                );
                match content.status {
                    ExtractionStatus::Fetched => Ok(()),
                    ExtractionStatus::Failed => Err(BriefwireError::Extraction(
                        content.error.unwrap_or_else(|| "extraction failed".into()),
                    )),
                }
            }
        },
    )
    .await;

    progress.done(&format!(
        "Extracted {}/{} articles",
        result.succeeded, result.processed
    ));
    Ok(result)
}

// ---------------------------------------------------------------------------
// Enrichment stage
// ---------------------------------------------------------------------------

/// Classify and topic-tag up to `batch_size` articles, then prune orphan topics.
#[instrument(skip_all, fields(concurrency = options.concurrency, refresh = options.refresh))]
pub async fn run_enrichment_batch(
    storage: Arc<Storage>,
    registry: Arc<SourceRegistry>,
    options: &EnrichOptions,
    progress: &dyn ProgressReporter,
) -> Result<EnrichmentBatchResult> {
    let candidates = storage
        .list_articles_for_enrichment(options.batch_size as u32, options.refresh)
        .await?;
    progress.phase("Tagging articles");

    let items = candidates
        .into_iter()
        .map(|c| (c.article.id.clone(), c))
        .collect();
    let pool_storage = Arc::clone(&storage);
    let legacy = Arc::new(AtomicBool::new(false));
    let pool_legacy = Arc::clone(&legacy);
    let mut result = run_pool(
        ENRICHMENT_STAGE,
        items,
        options.concurrency,
        TAGGING_BUDGET,
        progress,
        move |candidate: ArticleForEnrichment| {
            let storage = Arc::clone(&pool_storage);
            let registry = Arc::clone(&registry);
            let legacy = Arc::clone(&pool_legacy);
            async move {
                let outcome = enrich_article(&storage, &registry, candidate).await?;
                if outcome.used_legacy_fallback {
                    legacy.store(true, Ordering::SeqCst);
                }
                Ok(())
            }
        },
    )
    .await;
    result.used_legacy_fallback = legacy.load(Ordering::SeqCst);
    if result.used_legacy_fallback {
        warn!("tag columns missing, article tags were not written");
    }

    let pruned = storage.prune_orphan_topics().await?;
    info!(pruned, "orphan topics pruned after enrichment");

    progress.done(&format!(
        "Tagged {}/{} articles",
        result.succeeded, result.processed
    ));
    Ok(result)
}

/// Classify one article and replace its topic links. The outcome flags a
/// database without tag columns, where only the topic links were written.
pub async fn enrich_article(
    storage: &Storage,
    registry: &SourceRegistry,
    candidate: ArticleForEnrichment,
) -> Result<UpsertOutcome> {
    let article = &candidate.article;
    let (tags, topics) = tag_article(article, candidate.full_text.as_deref(), registry);
    let outcome = storage.update_article_tags(&article.id, &tags).await?;
    storage.replace_article_topics(&article.id, &topics).await?;
    Ok(outcome)
}

/// Classifier tags and persistable topics for an article.
pub fn tag_article(
    article: &PersistedArticle,
    full_text: Option<&str>,
    registry: &SourceRegistry,
) -> (ArticleTags, Vec<TopicCandidate>) {
    let input = ArticleText {
        title: &article.title,
        summary: &article.summary,
        url: &article.url,
        full_text,
        source: registry.get(&article.source_id),
    };
    let tags = classify(&input);
    let extraction = TopicExtractor::new(Taxonomy::builtin())
        .with_registry(registry)
        .extract(&input);
    let topics = extraction.persistable().into_iter().cloned().collect();
    (tags, topics)
}

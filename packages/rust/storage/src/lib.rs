//! Turso Embedded / libSQL storage layer.
//!
//! The [`Storage`] struct wraps a libSQL database holding the source catalog,
//! articles with their extracted content and tags, canonical topics, the
//! article-topic link table, and ingest run history.
//!
//! **Write rules:**
//! - Upserts are chunked ([`UPSERT_CHUNK_SIZE`] rows per transaction) and keyed
//!   on canonical URL (articles), source id (sources), or slug (topics).
//! - Transient contention is retried with linear backoff (see [`retry`]).
//! - The optional tag columns are an explicit capability ([`ArticleColumns`]),
//!   probed at open and downgraded if a write hits schema drift.

mod migrations;
pub mod retry;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use briefwire_shared::{
    ArticleTags, ArticleTopicLink, BriefwireError, ContentFetchStatus, ContentType,
    ExtractedContent, ExtractionStatus, FeedSource, MatchedBy, PersistedArticle,
    PersistenceErrorKind, Result, Topic, TopicCandidate, TopicType, Track,
};

pub use retry::{BACKOFF_STEP, MAX_ATTEMPTS, classify_persistence_error, with_retry};

/// Rows written per transaction.
pub const UPSERT_CHUNK_SIZE: usize = 300;

/// Optional tag columns added by migration v2.
const TAG_COLUMNS: &[&str] = &[
    "mission_tags",
    "domain_tags",
    "technology_tags",
    "track",
    "content_type",
    "high_impact",
];

/// Which article row shape the database accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleColumns {
    /// Base columns plus the tag columns.
    Full,
    /// Base columns only.
    Legacy,
}

/// Result of a chunked upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub written: usize,
    /// Rows were written in the legacy shape, without tag columns.
    pub used_legacy_fallback: bool,
}

/// An article row with its extracted body, as read for enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleForEnrichment {
    pub article: PersistedArticle,
    pub full_text: Option<String>,
}

/// A topic linked to an article.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedTopic {
    pub topic: Topic,
    pub link: ArticleTopicLink,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    /// Tag columns are present. Cleared on the first schema drift error.
    tag_columns: AtomicBool,
    /// Serializes write transactions on the shared connection.
    write_lock: Mutex<()>,
}

fn storage_err(e: impl std::fmt::Display) -> BriefwireError {
    BriefwireError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::open_at_version(path, migrations::LATEST_VERSION).await
    }

    /// Open a database migrated no further than `version`.
    async fn open_at_version(path: &Path, version: u32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BriefwireError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            tag_columns: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        };
        storage.run_migrations(version).await?;
        storage.probe_columns().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (for reporting commands).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: true,
            tag_columns: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        };
        storage.probe_columns().await?;
        Ok(storage)
    }

    /// Run pending schema migrations up to `target`.
    async fn run_migrations(&self, target: u32) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version && migration.version <= target {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        BriefwireError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Resolve the [`ArticleColumns`] capability from the live schema.
    async fn probe_columns(&self) -> Result<()> {
        let mut rows = self
            .conn
            .query("PRAGMA table_info(articles)", params![])
            .await
            .map_err(storage_err)?;

        let mut present = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            if let Ok(name) = row.get::<String>(1) {
                present.push(name);
            }
        }
        let full = TAG_COLUMNS
            .iter()
            .all(|col| present.iter().any(|p| p == col));
        self.tag_columns.store(full, Ordering::SeqCst);
        debug!(full, "article columns probed");
        Ok(())
    }

    /// The article row shape writes currently use.
    pub fn article_columns(&self) -> ArticleColumns {
        if self.tag_columns.load(Ordering::SeqCst) {
            ArticleColumns::Full
        } else {
            ArticleColumns::Legacy
        }
    }

    fn downgrade_columns(&self, operation: &str) {
        if self.tag_columns.swap(false, Ordering::SeqCst) {
            warn!(operation, "tag columns missing, falling back to legacy article shape");
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(BriefwireError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Source operations
    // -----------------------------------------------------------------------

    /// Upsert catalog entries by id.
    pub async fn upsert_sources(&self, sources: &[FeedSource]) -> Result<usize> {
        self.check_writable()?;
        let mut written = 0;
        for chunk in sources.chunks(UPSERT_CHUNK_SIZE) {
            written += with_retry("upsert_sources", move || self.write_sources(chunk)).await?;
        }
        Ok(written)
    }

    async fn write_sources(&self, chunk: &[FeedSource]) -> std::result::Result<usize, libsql::Error> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().await?;
        let result = async {
            for source in chunk {
                tx.execute(
                    "INSERT INTO sources (id, name, category, feed_url, homepage_url, weight, quality_tier, cadence, story_role, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       category = excluded.category,
                       feed_url = excluded.feed_url,
                       homepage_url = excluded.homepage_url,
                       weight = excluded.weight,
                       quality_tier = excluded.quality_tier,
                       cadence = excluded.cadence,
                       story_role = excluded.story_role,
                       updated_at = excluded.updated_at",
                    params![
                        source.id.as_str(),
                        source.name.as_str(),
                        enum_text(&source.category),
                        source.feed_url.as_str(),
                        source.homepage_url.as_str(),
                        source.weight,
                        enum_text(&source.quality_tier),
                        enum_text(&source.cadence),
                        enum_text(&source.story_role),
                        now.as_str(),
                    ],
                )
                .await?;
            }
            Ok::<_, libsql::Error>(chunk.len())
        }
        .await;
        finish_tx(tx, result).await
    }

    /// Number of catalog rows.
    pub async fn count_sources(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM sources").await
    }

    // -----------------------------------------------------------------------
    // Article operations
    // -----------------------------------------------------------------------

    /// Upsert articles keyed on canonical URL.
    ///
    /// An existing row keeps its id, content, and topic links; feed fields
    /// are overwritten, and tags too unless the row was already enriched. Without tag columns the legacy shape is
    /// written and the outcome is flagged.
    pub async fn upsert_articles(&self, articles: &[PersistedArticle]) -> Result<UpsertOutcome> {
        self.check_writable()?;
        let mut outcome = UpsertOutcome::default();

        for chunk in articles.chunks(UPSERT_CHUNK_SIZE) {
            let columns = self.article_columns();
            let attempt =
                with_retry("upsert_articles", move || self.write_articles(chunk, columns)).await;

            let written = match attempt {
                Ok(n) => n,
                Err(e)
                    if columns == ArticleColumns::Full
                        && e.persistence_kind() == Some(PersistenceErrorKind::SchemaDrift) =>
                {
                    self.downgrade_columns("upsert_articles");
                    with_retry("upsert_articles", move || {
                        self.write_articles(chunk, ArticleColumns::Legacy)
                    })
                    .await?
                }
                Err(e) => return Err(e),
            };

            outcome.written += written;
            if self.article_columns() == ArticleColumns::Legacy {
                outcome.used_legacy_fallback = true;
            }
        }

        debug!(
            written = outcome.written,
            legacy = outcome.used_legacy_fallback,
            "articles upserted"
        );
        Ok(outcome)
    }

    async fn write_articles(
        &self,
        chunk: &[PersistedArticle],
        columns: ArticleColumns,
    ) -> std::result::Result<usize, libsql::Error> {
        let _guard = self.write_lock.lock().await;
        let tx = self.conn.transaction().await?;
        let result = async {
            for article in chunk {
                let published_at = article.published_at.map(|d| d.to_rfc3339());
                let fetched_at = article.fetched_at.to_rfc3339();
                match columns {
                    ArticleColumns::Full => {
                        let tags = &article.tags;
                        tx.execute(
                            "INSERT INTO articles (id, url, source_id, title, summary, author, guid, published_at, fetched_at, content_fetch_status,
                                                   mission_tags, domain_tags, technology_tags, track, content_type, high_impact)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                             ON CONFLICT(url) DO UPDATE SET
                               source_id = excluded.source_id,
                               title = excluded.title,
                               summary = excluded.summary,
                               author = excluded.author,
                               guid = excluded.guid,
                               published_at = excluded.published_at,
                               fetched_at = excluded.fetched_at,
                               mission_tags = CASE WHEN articles.enriched_at IS NULL THEN excluded.mission_tags ELSE articles.mission_tags END,
                               domain_tags = CASE WHEN articles.enriched_at IS NULL THEN excluded.domain_tags ELSE articles.domain_tags END,
                               technology_tags = CASE WHEN articles.enriched_at IS NULL THEN excluded.technology_tags ELSE articles.technology_tags END,
                               track = CASE WHEN articles.enriched_at IS NULL THEN excluded.track ELSE articles.track END,
                               content_type = CASE WHEN articles.enriched_at IS NULL THEN excluded.content_type ELSE articles.content_type END,
                               high_impact = CASE WHEN articles.enriched_at IS NULL THEN excluded.high_impact ELSE articles.high_impact END",
                            params![
                                article.id.as_str(),
                                article.url.as_str(),
                                article.source_id.as_str(),
                                article.title.as_str(),
                                article.summary.as_str(),
                                article.author.as_deref(),
                                article.guid.as_deref(),
                                published_at.as_deref(),
                                fetched_at.as_str(),
                                article.content_fetch_status.as_str(),
                                json_list(&tags.missions),
                                json_list(&tags.domains),
                                json_list(&tags.technologies),
                                tags.track.as_str(),
                                tags.content_type.as_str(),
                                i64::from(tags.high_impact),
                            ],
                        )
                        .await?;
                    }
                    ArticleColumns::Legacy => {
                        tx.execute(
                            "INSERT INTO articles (id, url, source_id, title, summary, author, guid, published_at, fetched_at, content_fetch_status)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                             ON CONFLICT(url) DO UPDATE SET
                               source_id = excluded.source_id,
                               title = excluded.title,
                               summary = excluded.summary,
                               author = excluded.author,
                               guid = excluded.guid,
                               published_at = excluded.published_at,
                               fetched_at = excluded.fetched_at",
                            params![
                                article.id.as_str(),
                                article.url.as_str(),
                                article.source_id.as_str(),
                                article.title.as_str(),
                                article.summary.as_str(),
                                article.author.as_deref(),
                                article.guid.as_deref(),
                                published_at.as_deref(),
                                fetched_at.as_str(),
                                article.content_fetch_status.as_str(),
                            ],
                        )
                        .await?;
                    }
                }
            }
            Ok::<_, libsql::Error>(chunk.len())
        }
        .await;
        finish_tx(tx, result).await
    }

    /// Column list for article reads; tag columns become NULL in legacy mode.
    fn article_select(&self) -> &'static str {
        match self.article_columns() {
            ArticleColumns::Full => {
                "SELECT id, url, source_id, title, summary, author, guid, published_at, fetched_at, content_fetch_status,
                        mission_tags, domain_tags, technology_tags, content_type, track, high_impact, full_text
                 FROM articles"
            }
            ArticleColumns::Legacy => {
                "SELECT id, url, source_id, title, summary, author, guid, published_at, fetched_at, content_fetch_status,
                        NULL, NULL, NULL, NULL, NULL, 0, full_text
                 FROM articles"
            }
        }
    }

    /// Look up an article by canonical URL.
    pub async fn get_article_by_url(&self, url: &str) -> Result<Option<PersistedArticle>> {
        let sql = format!("{} WHERE url = ?1", self.article_select());
        let mut rows = self
            .conn
            .query(&sql, params![url])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_article(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Articles still waiting for content extraction, newest first.
    pub async fn list_articles_needing_content(&self, limit: u32) -> Result<Vec<PersistedArticle>> {
        let sql = format!(
            "{} WHERE content_fetch_status = 'pending'
             ORDER BY (published_at IS NULL), published_at DESC, url
             LIMIT ?1",
            self.article_select()
        );
        let mut rows = self
            .conn
            .query(&sql, params![limit])
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_article(&row)?);
        }
        Ok(results)
    }

    /// Articles to classify and topic-tag. Without `refresh`, only articles
    /// not enriched since their content last changed.
    pub async fn list_articles_for_enrichment(
        &self,
        limit: u32,
        refresh: bool,
    ) -> Result<Vec<ArticleForEnrichment>> {
        let filter = if refresh { "" } else { "WHERE enriched_at IS NULL" };
        let sql = format!(
            "{} {filter}
             ORDER BY (published_at IS NULL), published_at DESC, url
             LIMIT ?1",
            self.article_select()
        );
        let mut rows = self
            .conn
            .query(&sql, params![limit])
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(ArticleForEnrichment {
                article: row_to_article(&row)?,
                full_text: row.get::<String>(16).ok(),
            });
        }
        Ok(results)
    }

    /// Record an extraction outcome. A successful fetch clears `enriched_at`
    /// so the article is re-tagged with its full text.
    pub async fn save_content(&self, article_id: &str, content: &ExtractedContent) -> Result<()> {
        self.check_writable()?;
        with_retry("save_content", move || self.write_content(article_id, content)).await
    }

    async fn write_content(
        &self,
        article_id: &str,
        content: &ExtractedContent,
    ) -> std::result::Result<(), libsql::Error> {
        let _guard = self.write_lock.lock().await;
        let status = match content.status {
            ExtractionStatus::Fetched => ContentFetchStatus::Fetched,
            ExtractionStatus::Failed => ContentFetchStatus::Failed,
        };
        let fetched_at = content.fetched_at.to_rfc3339();
        self.conn
            .execute(
                "UPDATE articles SET
                   content_fetch_status = ?1,
                   full_text = ?2,
                   excerpt = ?3,
                   lead_image_url = ?4,
                   word_count = ?5,
                   reading_minutes = ?6,
                   content_hash = ?7,
                   content_error = ?8,
                   content_fetched_at = ?9,
                   enriched_at = CASE WHEN ?1 = 'fetched' THEN NULL ELSE enriched_at END
                 WHERE id = ?10",
                params![
                    status.as_str(),
                    content.full_text.as_deref(),
                    content.excerpt.as_deref(),
                    content.lead_image_url.as_deref(),
                    content.word_count.map(|w| w as i64),
                    content.reading_minutes.map(i64::from),
                    content.content_hash.as_deref(),
                    content.error.as_deref(),
                    fetched_at.as_str(),
                    article_id,
                ],
            )
            .await?;
        Ok(())
    }

    /// Overwrite an article's classifier tags. In legacy mode nothing is
    /// written and the outcome is flagged.
    pub async fn update_article_tags(
        &self,
        article_id: &str,
        tags: &ArticleTags,
    ) -> Result<UpsertOutcome> {
        self.check_writable()?;
        let legacy = UpsertOutcome {
            written: 0,
            used_legacy_fallback: true,
        };
        if self.article_columns() == ArticleColumns::Legacy {
            return Ok(legacy);
        }

        match with_retry("update_article_tags", move || self.write_tags(article_id, tags)).await {
            Ok(written) => Ok(UpsertOutcome {
                written,
                used_legacy_fallback: false,
            }),
            Err(e) if e.persistence_kind() == Some(PersistenceErrorKind::SchemaDrift) => {
                self.downgrade_columns("update_article_tags");
                Ok(legacy)
            }
            Err(e) => Err(e),
        }
    }

    async fn write_tags(
        &self,
        article_id: &str,
        tags: &ArticleTags,
    ) -> std::result::Result<usize, libsql::Error> {
        let _guard = self.write_lock.lock().await;
        let changed = self
            .conn
            .execute(
                "UPDATE articles SET
                   mission_tags = ?1,
                   domain_tags = ?2,
                   technology_tags = ?3,
                   track = ?4,
                   content_type = ?5,
                   high_impact = ?6
                 WHERE id = ?7",
                params![
                    json_list(&tags.missions),
                    json_list(&tags.domains),
                    json_list(&tags.technologies),
                    tags.track.as_str(),
                    tags.content_type.as_str(),
                    i64::from(tags.high_impact),
                    article_id,
                ],
            )
            .await?;
        Ok(changed as usize)
    }

    /// Total article rows.
    pub async fn count_articles(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM articles").await
    }

    async fn count(&self, sql: &str) -> Result<u64> {
        let mut rows = self.conn.query(sql, params![]).await.map_err(storage_err)?;
        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)? as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Topic operations
    // -----------------------------------------------------------------------

    /// Replace every topic link of `article_id` with `topics`, upserting the
    /// topic rows by slug, and mark the article enriched. Runs in one
    /// transaction. Phrase candidates are skipped.
    pub async fn replace_article_topics(
        &self,
        article_id: &str,
        topics: &[TopicCandidate],
    ) -> Result<usize> {
        self.check_writable()?;
        with_retry("replace_article_topics", move || {
            self.write_article_topics(article_id, topics)
        })
        .await
    }

    async fn write_article_topics(
        &self,
        article_id: &str,
        topics: &[TopicCandidate],
    ) -> std::result::Result<usize, libsql::Error> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().await?;
        let result = async {
            tx.execute(
                "DELETE FROM article_topics WHERE article_id = ?1",
                params![article_id],
            )
            .await?;

            let mut linked = 0;
            for topic in topics.iter().filter(|t| t.matched_by != MatchedBy::Phrase) {
                let topic_id = Uuid::now_v7().to_string();
                tx.execute(
                    "INSERT INTO topics (id, slug, label, topic_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(slug) DO UPDATE SET
                       label = excluded.label,
                       topic_type = excluded.topic_type",
                    params![
                        topic_id.as_str(),
                        topic.slug.as_str(),
                        topic.label.as_str(),
                        topic.topic_type.as_str(),
                        now.as_str(),
                    ],
                )
                .await?;
                linked += tx
                    .execute(
                        "INSERT INTO article_topics (article_id, topic_id, confidence, occurrences, is_primary)
                         SELECT ?1, id, ?2, ?3, ?4 FROM topics WHERE slug = ?5
                         ON CONFLICT(article_id, topic_id) DO UPDATE SET
                           confidence = excluded.confidence,
                           occurrences = excluded.occurrences,
                           is_primary = excluded.is_primary",
                        params![
                            article_id,
                            topic.confidence,
                            topic.occurrences,
                            i64::from(topic.is_primary),
                            topic.slug.as_str(),
                        ],
                    )
                    .await? as usize;
            }

            tx.execute(
                "UPDATE articles SET enriched_at = ?1 WHERE id = ?2",
                params![now.as_str(), article_id],
            )
            .await?;
            Ok::<_, libsql::Error>(linked)
        }
        .await;
        finish_tx(tx, result).await
    }

    /// Delete topics no longer linked to any article. Returns rows removed.
    pub async fn prune_orphan_topics(&self) -> Result<u64> {
        self.check_writable()?;
        let removed = with_retry("prune_orphan_topics", move || async move {
            let _guard = self.write_lock.lock().await;
            self.conn
                .execute(
                    "DELETE FROM topics
                     WHERE NOT EXISTS (SELECT 1 FROM article_topics at WHERE at.topic_id = topics.id)",
                    params![],
                )
                .await
        })
        .await?;
        if removed > 0 {
            info!(removed, "pruned orphan topics");
        }
        Ok(removed)
    }

    /// Topics linked to an article, primary and most confident first.
    pub async fn topics_for_article(&self, article_id: &str) -> Result<Vec<LinkedTopic>> {
        let mut rows = self
            .conn
            .query(
                "SELECT t.id, t.slug, t.label, t.topic_type, at.confidence, at.occurrences, at.is_primary
                 FROM article_topics at
                 JOIN topics t ON t.id = at.topic_id
                 WHERE at.article_id = ?1
                 ORDER BY at.is_primary DESC, at.confidence DESC, at.occurrences DESC, t.label",
                params![article_id],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let topic = Topic {
                id: row.get::<String>(0).map_err(storage_err)?,
                slug: row.get::<String>(1).map_err(storage_err)?,
                label: row.get::<String>(2).map_err(storage_err)?,
                topic_type: row
                    .get::<String>(3)
                    .map_err(storage_err)?
                    .parse::<TopicType>()?,
            };
            let link = ArticleTopicLink {
                article_id: article_id.to_string(),
                topic_id: topic.id.clone(),
                confidence: row.get::<f64>(4).map_err(storage_err)?,
                occurrences: row.get::<u32>(5).map_err(storage_err)?,
                is_primary: row.get::<i64>(6).map_err(storage_err)? != 0,
            };
            results.push(LinkedTopic { topic, link });
        }
        Ok(results)
    }

    /// Total topic rows.
    pub async fn count_topics(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM topics").await
    }

    // -----------------------------------------------------------------------
    // Ingest run operations
    // -----------------------------------------------------------------------

    /// Insert a new ingest run. Returns the generated run ID.
    pub async fn insert_ingest_run(&self) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Update an ingest run with completion data.
    pub async fn finish_ingest_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE ingest_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Stats JSON of a finished run.
    pub async fn ingest_run_stats(&self, run_id: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT stats_json FROM ingest_runs WHERE id = ?1",
                params![run_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<String>(0).ok()),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }
}

/// Commit on success, roll back on failure.
async fn finish_tx<T>(
    tx: libsql::Transaction,
    result: std::result::Result<T, libsql::Error>,
) -> std::result::Result<T, libsql::Error> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Serde's snake_case name for a unit enum variant.
fn enum_text<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

fn json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".into())
}

fn parse_json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BriefwireError::Storage(format!("invalid date: {e}")))
}

/// Convert a row from [`Storage::article_select`] to a [`PersistedArticle`].
fn row_to_article(row: &libsql::Row) -> Result<PersistedArticle> {
    let content_type = row
        .get::<String>(13)
        .ok()
        .and_then(|s| s.parse::<ContentType>().ok())
        .unwrap_or(ContentType::Program);
    let track = row
        .get::<String>(14)
        .ok()
        .and_then(|s| s.parse::<Track>().ok())
        .unwrap_or_else(|| content_type.track());

    Ok(PersistedArticle {
        id: row.get::<String>(0).map_err(storage_err)?,
        url: row.get::<String>(1).map_err(storage_err)?,
        source_id: row.get::<String>(2).map_err(storage_err)?,
        title: row.get::<String>(3).map_err(storage_err)?,
        summary: row.get::<String>(4).unwrap_or_default(),
        author: row.get::<String>(5).ok(),
        guid: row.get::<String>(6).ok(),
        published_at: match row.get::<String>(7).ok() {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        },
        fetched_at: parse_timestamp(&row.get::<String>(8).map_err(storage_err)?)?,
        content_fetch_status: row
            .get::<String>(9)
            .map_err(storage_err)?
            .parse::<ContentFetchStatus>()?,
        tags: ArticleTags {
            missions: parse_json_list(row.get::<String>(10).ok()),
            domains: parse_json_list(row.get::<String>(11).ok()),
            technologies: parse_json_list(row.get::<String>(12).ok()),
            content_type,
            track,
            high_impact: row.get::<i64>(15).unwrap_or(0) != 0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefwire_shared::{SourceRegistry, TopicType};
    use chrono::TimeZone;

    fn temp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("bw_test_{}.db", Uuid::now_v7()))
    }

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        Storage::open(&temp_path()).await.expect("open test db")
    }

    fn article(url: &str, title: &str) -> PersistedArticle {
        PersistedArticle {
            id: Uuid::now_v7().to_string(),
            url: url.into(),
            source_id: "defense-news".into(),
            title: title.into(),
            summary: "Summary text".into(),
            author: Some("Staff".into()),
            guid: None,
            tags: ArticleTags {
                missions: vec!["missile-defense".into()],
                domains: vec!["space".into()],
                technologies: vec!["sensors".into()],
                content_type: ContentType::Funding,
                track: Track::Capital,
                high_impact: true,
            },
            published_at: Some(Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()),
            fetched_at: Utc::now(),
            content_fetch_status: ContentFetchStatus::Pending,
        }
    }

    fn candidate(slug: &str, label: &str, matched_by: MatchedBy) -> TopicCandidate {
        TopicCandidate {
            slug: slug.into(),
            label: label.into(),
            topic_type: TopicType::Program,
            occurrences: 2,
            confidence: 0.9,
            is_primary: true,
            matched_by,
        }
    }

    fn fetched_content(text: &str) -> ExtractedContent {
        ExtractedContent {
            full_text: Some(text.into()),
            excerpt: Some(text.into()),
            lead_image_url: None,
            word_count: Some(text.split_whitespace().count()),
            reading_minutes: Some(1),
            content_hash: Some("abc".into()),
            status: ExtractionStatus::Fetched,
            error: None,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, migrations::LATEST_VERSION);
        assert_eq!(storage.article_columns(), ArticleColumns::Full);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = temp_path();
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, migrations::LATEST_VERSION);
    }

    #[tokio::test]
    async fn legacy_database_upgrades_on_open() {
        let tmp = temp_path();
        let legacy = Storage::open_at_version(&tmp, 1).await.unwrap();
        assert_eq!(legacy.article_columns(), ArticleColumns::Legacy);
        drop(legacy);

        let upgraded = Storage::open(&tmp).await.unwrap();
        assert_eq!(upgraded.article_columns(), ArticleColumns::Full);
    }

    #[tokio::test]
    async fn sources_upsert_by_id() {
        let storage = test_storage().await;
        let registry = SourceRegistry::builtin();
        let written = storage.upsert_sources(registry.sources()).await.unwrap();
        assert_eq!(written, registry.len());
        storage.upsert_sources(registry.sources()).await.unwrap();
        assert_eq!(storage.count_sources().await.unwrap(), registry.len() as u64);
    }

    #[tokio::test]
    async fn article_upsert_is_idempotent_and_keeps_id() {
        let storage = test_storage().await;
        let first = article("https://example.com/a", "First title");
        let outcome = storage.upsert_articles(&[first.clone()]).await.unwrap();
        assert_eq!(
            outcome,
            UpsertOutcome {
                written: 1,
                used_legacy_fallback: false
            }
        );

        let mut again = article("https://example.com/a", "Updated title");
        again.tags.high_impact = false;
        storage.upsert_articles(&[again]).await.unwrap();

        assert_eq!(storage.count_articles().await.unwrap(), 1);
        let stored = storage
            .get_article_by_url("https://example.com/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.title, "Updated title");
        assert_eq!(stored.tags.missions, vec!["missile-defense".to_string()]);
        assert!(!stored.tags.high_impact);
        assert_eq!(stored.published_at, first.published_at);
    }

    #[tokio::test]
    async fn upserts_are_chunked() {
        let storage = test_storage().await;
        let articles: Vec<_> = (0..UPSERT_CHUNK_SIZE + 5)
            .map(|i| article(&format!("https://example.com/{i}"), "t"))
            .collect();
        let outcome = storage.upsert_articles(&articles).await.unwrap();
        assert_eq!(outcome.written, UPSERT_CHUNK_SIZE + 5);
        assert_eq!(storage.count_articles().await.unwrap(), (UPSERT_CHUNK_SIZE + 5) as u64);
    }

    #[tokio::test]
    async fn legacy_schema_writes_reduced_shape() {
        let storage = Storage::open_at_version(&temp_path(), 1).await.unwrap();
        let outcome = storage
            .upsert_articles(&[article("https://example.com/legacy", "Legacy row")])
            .await
            .unwrap();
        assert_eq!(outcome.written, 1);
        assert!(outcome.used_legacy_fallback);

        let stored = storage
            .get_article_by_url("https://example.com/legacy")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.tags, ArticleTags::default());

        let tags = storage
            .update_article_tags(&stored.id, &article("x", "y").tags)
            .await
            .unwrap();
        assert!(tags.used_legacy_fallback);
    }

    #[tokio::test]
    async fn runtime_drift_downgrades_capability() {
        let storage = Storage::open_at_version(&temp_path(), 1).await.unwrap();
        // Pretend the probe saw tag columns that the table does not have.
        storage.tag_columns.store(true, Ordering::SeqCst);

        let outcome = storage
            .upsert_articles(&[article("https://example.com/drift", "Drift")])
            .await
            .unwrap();
        assert_eq!(outcome.written, 1);
        assert!(outcome.used_legacy_fallback);
        assert_eq!(storage.article_columns(), ArticleColumns::Legacy);
        assert_eq!(storage.count_articles().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn content_lifecycle() {
        let storage = test_storage().await;
        let a = article("https://example.com/c", "Content");
        let b = article("https://example.com/d", "Other");
        storage.upsert_articles(&[a.clone(), b.clone()]).await.unwrap();
        assert_eq!(storage.list_articles_needing_content(10).await.unwrap().len(), 2);

        storage
            .save_content(&a.id, &fetched_content("body text here"))
            .await
            .unwrap();
        storage
            .save_content(&b.id, &ExtractedContent::failed("HTTP 404"))
            .await
            .unwrap();

        assert!(storage.list_articles_needing_content(10).await.unwrap().is_empty());
        let stored = storage.get_article_by_url(&a.url).await.unwrap().unwrap();
        assert_eq!(stored.content_fetch_status, ContentFetchStatus::Fetched);
        let failed = storage.get_article_by_url(&b.url).await.unwrap().unwrap();
        assert_eq!(failed.content_fetch_status, ContentFetchStatus::Failed);

        // Re-ingesting does not reset extraction state.
        storage.upsert_articles(&[a.clone()]).await.unwrap();
        let stored = storage.get_article_by_url(&a.url).await.unwrap().unwrap();
        assert_eq!(stored.content_fetch_status, ContentFetchStatus::Fetched);

        let pending = storage.list_articles_for_enrichment(10, false).await.unwrap();
        let with_text = pending.iter().find(|p| p.article.id == a.id).unwrap();
        assert_eq!(with_text.full_text.as_deref(), Some("body text here"));
    }

    #[tokio::test]
    async fn topic_links_are_replaced_and_orphans_pruned() {
        let storage = test_storage().await;
        let a = article("https://example.com/t", "Topics");
        storage.upsert_articles(&[a.clone()]).await.unwrap();

        let linked = storage
            .replace_article_topics(
                &a.id,
                &[
                    candidate("golden-dome", "Golden Dome", MatchedBy::Alias),
                    candidate("sentinel-icbm", "Sentinel ICBM", MatchedBy::ContextAlias),
                    candidate("acme-widgets", "Acme Widgets", MatchedBy::Phrase),
                ],
            )
            .await
            .unwrap();
        assert_eq!(linked, 2);
        assert_eq!(storage.count_topics().await.unwrap(), 2);

        // Enriched articles drop out of the default enrichment queue.
        assert!(storage.list_articles_for_enrichment(10, false).await.unwrap().is_empty());
        assert_eq!(storage.list_articles_for_enrichment(10, true).await.unwrap().len(), 1);

        storage
            .replace_article_topics(
                &a.id,
                &[candidate("golden-dome", "Golden Dome", MatchedBy::Alias)],
            )
            .await
            .unwrap();
        let topics = storage.topics_for_article(&a.id).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].topic.slug, "golden-dome");
        assert!(topics[0].link.is_primary);
        assert_eq!(topics[0].link.occurrences, 2);

        assert_eq!(storage.count_topics().await.unwrap(), 2);
        assert_eq!(storage.prune_orphan_topics().await.unwrap(), 1);
        assert_eq!(storage.count_topics().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tags_update_in_full_mode() {
        let storage = test_storage().await;
        let a = article("https://example.com/tags", "Tags");
        storage.upsert_articles(&[a.clone()]).await.unwrap();

        let tags = ArticleTags {
            missions: vec![],
            domains: vec!["multi-domain".into()],
            technologies: vec![],
            content_type: ContentType::Policy,
            track: Track::Macro,
            high_impact: false,
        };
        let outcome = storage.update_article_tags(&a.id, &tags).await.unwrap();
        assert_eq!(outcome.written, 1);
        assert!(!outcome.used_legacy_fallback);
        let stored = storage.get_article_by_url(&a.url).await.unwrap().unwrap();
        assert_eq!(stored.tags, tags);
    }

    #[tokio::test]
    async fn reingest_keeps_enriched_tags() {
        let storage = test_storage().await;
        let a = article("https://example.com/enriched", "Enriched");
        storage.upsert_articles(&[a.clone()]).await.unwrap();

        let mut tags = a.tags.clone();
        tags.domains = vec!["land".into()];
        storage.update_article_tags(&a.id, &tags).await.unwrap();
        storage.replace_article_topics(&a.id, &[]).await.unwrap();

        storage.upsert_articles(&[a.clone()]).await.unwrap();
        let stored = storage.get_article_by_url(&a.url).await.unwrap().unwrap();
        assert_eq!(stored.tags.domains, vec!["land".to_string()]);
    }

    #[tokio::test]
    async fn ingest_run_lifecycle() {
        let storage = test_storage().await;
        let run_id = storage.insert_ingest_run().await.expect("insert run");
        assert!(!run_id.is_empty());
        storage
            .finish_ingest_run(&run_id, r#"{"articles": 10}"#)
            .await
            .expect("finish run");
        let stats = storage.ingest_run_stats(&run_id).await.unwrap();
        assert!(stats.unwrap().contains("articles"));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = temp_path();
        let rw = Storage::open(&tmp).await.unwrap();
        rw.upsert_articles(&[article("https://example.com/ro", "RO")])
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.count_articles().await.unwrap(), 1);
        let result = ro.insert_ingest_run().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}

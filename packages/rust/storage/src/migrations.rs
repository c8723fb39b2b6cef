//! SQL migration definitions for the Briefwire database.
//!
//! Migrations are applied in order on database open. Version 1 is the base
//! ("legacy") article shape; version 2 adds the optional tag columns, which
//! older deployments may lack.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Latest schema version.
pub(crate) const LATEST_VERSION: u32 = 2;

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Base schema: sources, articles, topics, article_topics, ingest_runs",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Feed catalog snapshot
CREATE TABLE IF NOT EXISTS sources (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    category     TEXT NOT NULL,
    feed_url     TEXT NOT NULL,
    homepage_url TEXT NOT NULL,
    weight       REAL NOT NULL,
    quality_tier TEXT NOT NULL,
    cadence      TEXT NOT NULL,
    story_role   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- Articles, one row per canonical URL
CREATE TABLE IF NOT EXISTS articles (
    id                   TEXT PRIMARY KEY,
    url                  TEXT NOT NULL UNIQUE,
    source_id            TEXT NOT NULL,
    title                TEXT NOT NULL,
    summary              TEXT NOT NULL DEFAULT '',
    author               TEXT,
    guid                 TEXT,
    published_at         TEXT,
    fetched_at           TEXT NOT NULL,
    content_fetch_status TEXT NOT NULL DEFAULT 'pending',
    full_text            TEXT,
    excerpt              TEXT,
    lead_image_url       TEXT,
    word_count           INTEGER,
    reading_minutes      INTEGER,
    content_hash         TEXT,
    content_error        TEXT,
    content_fetched_at   TEXT,
    enriched_at          TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_id);
CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(content_fetch_status);
CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_at);

-- Canonical topics
CREATE TABLE IF NOT EXISTS topics (
    id         TEXT PRIMARY KEY,
    slug       TEXT NOT NULL UNIQUE,
    label      TEXT NOT NULL,
    topic_type TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Article-topic links, replaced wholesale per article
CREATE TABLE IF NOT EXISTS article_topics (
    article_id  TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    topic_id    TEXT NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
    confidence  REAL NOT NULL,
    occurrences INTEGER NOT NULL,
    is_primary  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (article_id, topic_id)
);

CREATE INDEX IF NOT EXISTS idx_article_topics_topic ON article_topics(topic_id);

-- Ingest run history
CREATE TABLE IF NOT EXISTS ingest_runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Article tag columns",
            sql: r#"
ALTER TABLE articles ADD COLUMN mission_tags TEXT;
ALTER TABLE articles ADD COLUMN domain_tags TEXT;
ALTER TABLE articles ADD COLUMN technology_tags TEXT;
ALTER TABLE articles ADD COLUMN track TEXT;
ALTER TABLE articles ADD COLUMN content_type TEXT;
ALTER TABLE articles ADD COLUMN high_impact INTEGER NOT NULL DEFAULT 0;

CREATE INDEX IF NOT EXISTS idx_articles_track ON articles(track);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}

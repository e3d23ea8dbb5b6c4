//! SQL schema for the Verity SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS truth_clusters (
    cluster_id          TEXT PRIMARY KEY,
    topic_summary       TEXT NOT NULL,
    final_truth_summary TEXT,
    confidence_score    REAL,
    created_at          TEXT NOT NULL,
    evaluated_at        TEXT
);

-- Seed vector of each cluster, written in the same transaction as the
-- cluster row. Used to rebuild the in-memory index at startup.
CREATE TABLE IF NOT EXISTS cluster_vectors (
    cluster_id  TEXT PRIMARY KEY REFERENCES truth_clusters(cluster_id),
    dimensions  INTEGER NOT NULL,
    vector_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS articles (
    article_id        TEXT PRIMARY KEY,
    url               TEXT NOT NULL UNIQUE,
    title             TEXT NOT NULL,
    content           TEXT NOT NULL,
    publish_date      TEXT,             -- RFC 3339 UTC or NULL
    source            TEXT NOT NULL,
    country           TEXT,
    credibility_score REAL NOT NULL DEFAULT 0 CHECK (credibility_score BETWEEN 0 AND 1),
    topic_cluster_id  TEXT REFERENCES truth_clusters(cluster_id),
    ingested_at       TEXT NOT NULL
);

-- Replaced wholesale when their article is reprocessed.
CREATE TABLE IF NOT EXISTS claims (
    claim_id   TEXT PRIMARY KEY,
    article_id TEXT NOT NULL REFERENCES articles(article_id) ON DELETE CASCADE,
    claim_text TEXT NOT NULL,
    claim_type TEXT NOT NULL CHECK (claim_type IN ('fact', 'prediction', 'opinion', 'speculation')),
    sentiment  TEXT NOT NULL CHECK (sentiment IN ('positive', 'negative', 'neutral'))
);

-- Fully rewritten on every evaluation of a cluster.
CREATE TABLE IF NOT EXISTS claim_supports (
    cluster_id   TEXT NOT NULL REFERENCES truth_clusters(cluster_id),
    claim_id     TEXT NOT NULL REFERENCES claims(claim_id) ON DELETE CASCADE,
    support_type TEXT NOT NULL CHECK (support_type IN ('supporting', 'contradicting'))
);

CREATE INDEX IF NOT EXISTS articles_cluster_idx ON articles(topic_cluster_id);
CREATE INDEX IF NOT EXISTS claims_article_idx   ON claims(article_id);
CREATE INDEX IF NOT EXISTS supports_cluster_idx ON claim_supports(cluster_id);

PRAGMA user_version = 1;
";

//! [`SqliteStore`], the SQLite implementation of [`ArticleStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;
use verity_core::{
  article::{Article, NewArticle, SourcedClaim},
  cluster::{ClaimSupport, TruthCluster},
  store::{ArticleAnalysis, ArticleStore, ClusterEvaluation, Placement},
};

use crate::{
  Error, Result,
  encode::{
    ARTICLE_COLUMNS, RawArticle, RawCluster, RawSourcedClaim, RawSupport, decode_uuid,
    decode_vector, encode_dt, encode_uuid, encode_vector,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Verity article store backed by a single SQLite file.
///
/// Clones share the same underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ArticleStore impl ───────────────────────────────────────────────────────

impl ArticleStore for SqliteStore {
  type Error = Error;

  // ── Articles ──────────────────────────────────────────────────────────────

  async fn insert_article(&self, input: NewArticle) -> Result<Option<Article>> {
    let article = Article {
      article_id:        Uuid::new_v4(),
      url:               input.url,
      title:             input.title,
      content:           input.content,
      publish_date:      input.publish_date,
      source:            input.source,
      country:           input.country,
      credibility_score: 0.0,
      topic_cluster_id:  None,
      ingested_at:       Utc::now(),
    };

    let id_str       = encode_uuid(article.article_id);
    let url          = article.url.clone();
    let title        = article.title.clone();
    let content      = article.content.clone();
    let publish_str  = article.publish_date.map(encode_dt);
    let source       = article.source.clone();
    let country      = article.country.clone();
    let ingested_str = encode_dt(article.ingested_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO articles (
             article_id, url, title, content, publish_date,
             source, country, credibility_score, ingested_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
           ON CONFLICT(url) DO NOTHING",
          rusqlite::params![
            id_str,
            url,
            title,
            content,
            publish_str,
            source,
            country,
            ingested_str,
          ],
        )?;
        Ok(changed > 0)
      })
      .await?;

    Ok(inserted.then_some(article))
  }

  async fn get_article(&self, id: Uuid) -> Result<Option<Article>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE article_id = ?1");

    let raw: Option<RawArticle> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawArticle::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawArticle::into_article).transpose()
  }

  async fn cluster_articles(&self, cluster_id: Uuid) -> Result<Vec<Article>> {
    let id_str = encode_uuid(cluster_id);
    let sql = format!(
      "SELECT {ARTICLE_COLUMNS} FROM articles WHERE topic_cluster_id = ?1 ORDER BY rowid"
    );

    let raws: Vec<RawArticle> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawArticle::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArticle::into_article).collect()
  }

  async fn commit_analysis(&self, analysis: ArticleAnalysis) -> Result<Uuid> {
    let article_id = analysis.article_id;

    let (cluster_id, new_cluster) = match analysis.placement {
      Placement::Existing(id) => (id, None),
      Placement::New { topic_summary, seed_vector } => {
        let dims = seed_vector.len() as i64;
        let vector_json = encode_vector(&seed_vector)?;
        (Uuid::new_v4(), Some((topic_summary, dims, vector_json)))
      }
    };

    let cluster_str = encode_uuid(cluster_id);
    let article_str = encode_uuid(article_id);
    let now_str     = encode_dt(Utc::now());
    let claims: Vec<_> = analysis
      .claims
      .into_iter()
      .map(|c| (encode_uuid(Uuid::new_v4()), c.claim_text, c.claim_type, c.sentiment))
      .collect();

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some((summary, dims, vector_json)) = new_cluster {
          tx.execute(
            "INSERT INTO truth_clusters (cluster_id, topic_summary, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![cluster_str, summary, now_str],
          )?;
          tx.execute(
            "INSERT INTO cluster_vectors (cluster_id, dimensions, vector_json)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![cluster_str, dims, vector_json],
          )?;
        }

        let updated = tx.execute(
          "UPDATE articles SET topic_cluster_id = ?1 WHERE article_id = ?2",
          rusqlite::params![cluster_str, article_str],
        )?;
        if updated == 0 {
          // Dropping the transaction rolls back the cluster insert.
          return Ok(false);
        }

        // Reprocessing an article replaces the claims from its previous run.
        tx.execute(
          "DELETE FROM claims WHERE article_id = ?1",
          rusqlite::params![article_str],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO claims (claim_id, article_id, claim_text, claim_type, sentiment)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for (claim_id, text, claim_type, sentiment) in &claims {
            stmt.execute(rusqlite::params![
              claim_id,
              article_str,
              text,
              claim_type.as_ref(),
              sentiment.as_ref(),
            ])?;
          }
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::ArticleNotFound(article_id));
    }
    Ok(cluster_id)
  }

  // ── Clusters ──────────────────────────────────────────────────────────────

  async fn get_cluster(&self, id: Uuid) -> Result<Option<TruthCluster>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCluster> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT cluster_id, topic_summary, final_truth_summary,
                      confidence_score, created_at, evaluated_at
               FROM truth_clusters WHERE cluster_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawCluster {
                  cluster_id:          row.get(0)?,
                  topic_summary:       row.get(1)?,
                  final_truth_summary: row.get(2)?,
                  confidence_score:    row.get(3)?,
                  created_at:          row.get(4)?,
                  evaluated_at:        row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCluster::into_cluster).transpose()
  }

  async fn list_cluster_ids(&self) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT cluster_id FROM truth_clusters ORDER BY rowid")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn cluster_vectors(&self) -> Result<Vec<(Uuid, Vec<f32>)>> {
    let rows: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT v.cluster_id, v.vector_json
           FROM cluster_vectors v
           JOIN truth_clusters t ON t.cluster_id = v.cluster_id
           ORDER BY t.rowid",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .iter()
      .map(|(id, json)| Ok((decode_uuid(id)?, decode_vector(json)?)))
      .collect()
  }

  async fn cluster_claims(&self, cluster_id: Uuid) -> Result<Vec<SourcedClaim>> {
    let id_str = encode_uuid(cluster_id);

    let raws: Vec<RawSourcedClaim> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.claim_id, c.article_id, c.claim_text, c.claim_type,
                  c.sentiment, a.source
           FROM claims c
           JOIN articles a ON a.article_id = c.article_id
           WHERE a.topic_cluster_id = ?1
           ORDER BY c.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawSourcedClaim {
              claim_id:   row.get(0)?,
              article_id: row.get(1)?,
              claim_text: row.get(2)?,
              claim_type: row.get(3)?,
              sentiment:  row.get(4)?,
              source:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSourcedClaim::into_sourced).collect()
  }

  // ── Evaluation ────────────────────────────────────────────────────────────

  async fn commit_evaluation(&self, evaluation: ClusterEvaluation) -> Result<()> {
    let cluster_str = encode_uuid(evaluation.cluster_id);
    let now_str     = encode_dt(Utc::now());
    let supports: Vec<_> = evaluation
      .supports
      .iter()
      .map(|s| (encode_uuid(s.claim_id), s.support_type))
      .collect();
    let credibility: Vec<_> = evaluation
      .credibility
      .iter()
      .map(|(id, score)| (encode_uuid(*id), score.clamp(0.0, 1.0)))
      .collect();
    let verdict = evaluation.verdict;

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM truth_clusters WHERE cluster_id = ?1",
            rusqlite::params![cluster_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(false);
        }

        tx.execute(
          "DELETE FROM claim_supports WHERE cluster_id = ?1",
          rusqlite::params![cluster_str],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO claim_supports (cluster_id, claim_id, support_type)
             VALUES (?1, ?2, ?3)",
          )?;
          for (claim_id, support_type) in &supports {
            stmt.execute(rusqlite::params![cluster_str, claim_id, support_type.as_ref()])?;
          }
        }
        {
          let mut stmt =
            tx.prepare("UPDATE articles SET credibility_score = ?1 WHERE article_id = ?2")?;
          for (article_id, score) in &credibility {
            stmt.execute(rusqlite::params![score, article_id])?;
          }
        }
        if let Some(verdict) = verdict {
          tx.execute(
            "UPDATE truth_clusters
             SET final_truth_summary = ?1, confidence_score = ?2, evaluated_at = ?3
             WHERE cluster_id = ?4",
            rusqlite::params![
              verdict.final_truth_summary,
              verdict.confidence_score,
              now_str,
              cluster_str,
            ],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::ClusterNotFound(evaluation.cluster_id));
    }
    Ok(())
  }

  async fn cluster_supports(&self, cluster_id: Uuid) -> Result<Vec<ClaimSupport>> {
    let id_str = encode_uuid(cluster_id);

    let raws: Vec<RawSupport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT cluster_id, claim_id, support_type
           FROM claim_supports WHERE cluster_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawSupport {
              cluster_id:   row.get(0)?,
              claim_id:     row.get(1)?,
              support_type: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSupport::into_support).collect()
  }
}

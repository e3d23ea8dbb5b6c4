//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, enum
//! labels their lowercase names, and vectors compact JSON arrays.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use verity_core::{
  article::{Article, Claim, ClaimType, Sentiment, SourcedClaim},
  cluster::{ClaimSupport, SupportType, TruthCluster},
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Vectors ─────────────────────────────────────────────────────────────────

pub fn encode_vector(v: &[f32]) -> Result<String> { Ok(serde_json::to_string(v)?) }

pub fn decode_vector(s: &str) -> Result<Vec<f32>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawArticle`] field order.
pub const ARTICLE_COLUMNS: &str = "article_id, url, title, content, publish_date, source, \
                                   country, credibility_score, topic_cluster_id, ingested_at";

/// Raw values read directly from an `articles` row.
pub struct RawArticle {
  pub article_id:        String,
  pub url:               String,
  pub title:             String,
  pub content:           String,
  pub publish_date:      Option<String>,
  pub source:            String,
  pub country:           Option<String>,
  pub credibility_score: f64,
  pub topic_cluster_id:  Option<String>,
  pub ingested_at:       String,
}

impl RawArticle {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      article_id:        row.get(0)?,
      url:               row.get(1)?,
      title:             row.get(2)?,
      content:           row.get(3)?,
      publish_date:      row.get(4)?,
      source:            row.get(5)?,
      country:           row.get(6)?,
      credibility_score: row.get(7)?,
      topic_cluster_id:  row.get(8)?,
      ingested_at:       row.get(9)?,
    })
  }

  pub fn into_article(self) -> Result<Article> {
    Ok(Article {
      article_id:        decode_uuid(&self.article_id)?,
      url:               self.url,
      title:             self.title,
      content:           self.content,
      publish_date:      decode_opt_dt(self.publish_date)?,
      source:            self.source,
      country:           self.country,
      credibility_score: self.credibility_score,
      topic_cluster_id:  self.topic_cluster_id.as_deref().map(decode_uuid).transpose()?,
      ingested_at:       decode_dt(&self.ingested_at)?,
    })
  }
}

/// Raw values from a `claims` row joined with its article's `source`.
pub struct RawSourcedClaim {
  pub claim_id:   String,
  pub article_id: String,
  pub claim_text: String,
  pub claim_type: String,
  pub sentiment:  String,
  pub source:     String,
}

impl RawSourcedClaim {
  pub fn into_sourced(self) -> Result<SourcedClaim> {
    let claim = Claim {
      claim_id:   decode_uuid(&self.claim_id)?,
      article_id: decode_uuid(&self.article_id)?,
      claim_text: self.claim_text,
      claim_type: ClaimType::from_label(&self.claim_type)?,
      sentiment:  Sentiment::from_label(&self.sentiment)?,
    };
    Ok(SourcedClaim { claim, source: self.source })
  }
}

/// Raw values read directly from a `truth_clusters` row.
pub struct RawCluster {
  pub cluster_id:          String,
  pub topic_summary:       String,
  pub final_truth_summary: Option<String>,
  pub confidence_score:    Option<f64>,
  pub created_at:          String,
  pub evaluated_at:        Option<String>,
}

impl RawCluster {
  pub fn into_cluster(self) -> Result<TruthCluster> {
    Ok(TruthCluster {
      cluster_id:          decode_uuid(&self.cluster_id)?,
      topic_summary:       self.topic_summary,
      final_truth_summary: self.final_truth_summary,
      confidence_score:    self.confidence_score,
      created_at:          decode_dt(&self.created_at)?,
      evaluated_at:        decode_opt_dt(self.evaluated_at)?,
    })
  }
}

/// Raw values read directly from a `claim_supports` row.
pub struct RawSupport {
  pub cluster_id:   String,
  pub claim_id:     String,
  pub support_type: String,
}

impl RawSupport {
  pub fn into_support(self) -> Result<ClaimSupport> {
    Ok(ClaimSupport {
      cluster_id:   decode_uuid(&self.cluster_id)?,
      claim_id:     decode_uuid(&self.claim_id)?,
      support_type: SupportType::from_label(&self.support_type)?,
    })
  }
}

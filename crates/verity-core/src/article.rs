//! Articles and the claims extracted from them.
//!
//! An article is identified by its source URL. Ingestion creates it with a
//! credibility of zero and no topic cluster; both fields are written only by
//! the clustering and scoring engine. Claims belong to exactly one article
//! and are never updated once recorded.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Labels ──────────────────────────────────────────────────────────────────

/// What kind of statement a claim is.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClaimType {
  Fact,
  Prediction,
  Opinion,
  Speculation,
}

/// The tone of a claim.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sentiment {
  Positive,
  Negative,
  Neutral,
}

impl ClaimType {
  pub fn from_label(label: &str) -> Result<Self> {
    Self::from_str(label).map_err(|_| Error::UnknownLabel {
      kind:  "claim type",
      label: label.to_owned(),
    })
  }
}

impl Sentiment {
  pub fn from_label(label: &str) -> Result<Self> {
    Self::from_str(label).map_err(|_| Error::UnknownLabel {
      kind:  "sentiment",
      label: label.to_owned(),
    })
  }
}

// ─── Article ─────────────────────────────────────────────────────────────────

/// A persisted news article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
  pub article_id:        Uuid,
  /// Unique; the deduplication key for ingestion.
  pub url:               String,
  pub title:             String,
  pub content:           String,
  pub publish_date:      Option<DateTime<Utc>>,
  /// Publisher name; looked up in the source trust table.
  pub source:            String,
  pub country:           Option<String>,
  /// Fraction of this article's claims confirmed by the latest evaluation
  /// of its cluster. Always within `[0, 1]`.
  pub credibility_score: f64,
  pub topic_cluster_id:  Option<Uuid>,
  /// Server-assigned timestamp; never changes after creation.
  pub ingested_at:       DateTime<Utc>,
}

impl Article {
  /// The text submitted to the embedding provider for topic assignment.
  pub fn embedding_text(&self) -> &str {
    if self.content.trim().is_empty() {
      &self.title
    } else {
      &self.content
    }
  }
}

/// Input to [`crate::store::ArticleStore::insert_article`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
  pub url:          String,
  pub title:        String,
  pub content:      String,
  pub publish_date: Option<DateTime<Utc>>,
  pub source:       String,
  pub country:      Option<String>,
}

// ─── Claim ───────────────────────────────────────────────────────────────────

/// An atomic statement extracted from an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
  pub claim_id:   Uuid,
  pub article_id: Uuid,
  pub claim_text: String,
  pub claim_type: ClaimType,
  pub sentiment:  Sentiment,
}

/// A claim as returned by the extraction model, before it is attached to an
/// article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClaim {
  pub claim_text: String,
  pub claim_type: ClaimType,
  pub sentiment:  Sentiment,
}

/// A claim joined with the source of the article that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedClaim {
  pub claim:  Claim,
  pub source: String,
}

//! Topic clusters and the support rows derived from evaluating them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// One real-world topic, grouping articles with similar embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthCluster {
  pub cluster_id:          Uuid,
  /// Seeded from the title of the article that created the cluster.
  pub topic_summary:       String,
  /// Derived narrative; unset until the cluster has been evaluated with at
  /// least two claims.
  pub final_truth_summary: Option<String>,
  pub confidence_score:    Option<f64>,
  pub created_at:          DateTime<Utc>,
  pub evaluated_at:        Option<DateTime<Utc>>,
}

/// Which side of a semantic group a claim ended up on.
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
pub enum SupportType {
  Supporting,
  Contradicting,
}

impl SupportType {
  pub fn from_label(label: &str) -> Result<Self> {
    Self::from_str(label).map_err(|_| Error::UnknownLabel {
      kind:  "support type",
      label: label.to_owned(),
    })
  }
}

/// A claim recorded as part of the winning side of its group during the
/// latest evaluation of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSupport {
  pub cluster_id:   Uuid,
  pub claim_id:     Uuid,
  pub support_type: SupportType,
}

// ─── Verdict ─────────────────────────────────────────────────────────────────

/// Coarse label derived from a cluster's confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictLabel {
  HighlyLikelyTrue,
  LikelyTrue,
  Inconclusive,
  LikelyFalse,
}

impl VerdictLabel {
  pub fn from_confidence(confidence: f64) -> Self {
    if confidence >= 0.8 {
      Self::HighlyLikelyTrue
    } else if confidence >= 0.6 {
      Self::LikelyTrue
    } else if confidence >= 0.4 {
      Self::Inconclusive
    } else {
      Self::LikelyFalse
    }
  }

  pub fn as_phrase(&self) -> &'static str {
    match self {
      Self::HighlyLikelyTrue => "Highly likely true",
      Self::LikelyTrue => "Likely true",
      Self::Inconclusive => "Inconclusive",
      Self::LikelyFalse => "Likely false",
    }
  }
}

/// The cluster-level fields written at the end of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
  pub label:               VerdictLabel,
  pub confidence_score:    f64,
  pub final_truth_summary: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verdict_thresholds_are_inclusive() {
    assert_eq!(VerdictLabel::from_confidence(0.8), VerdictLabel::HighlyLikelyTrue);
    assert_eq!(VerdictLabel::from_confidence(0.79), VerdictLabel::LikelyTrue);
    assert_eq!(VerdictLabel::from_confidence(0.6), VerdictLabel::LikelyTrue);
    assert_eq!(VerdictLabel::from_confidence(0.4), VerdictLabel::Inconclusive);
    assert_eq!(VerdictLabel::from_confidence(0.399), VerdictLabel::LikelyFalse);
  }

  #[test]
  fn support_type_labels() {
    assert_eq!(SupportType::Contradicting.as_ref(), "contradicting");
    assert_eq!(
      SupportType::from_label("supporting").unwrap(),
      SupportType::Supporting
    );
    assert!(SupportType::from_label("neutral").is_err());
  }
}

//! Traits for the two network collaborators: the embedding provider and the
//! language model.
//!
//! Implementations live in `verity-engine`. Every method is a suspension
//! point and may fail transiently; callers wrap them with a retry policy.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::article::NewClaim;

/// Failure talking to an external model provider.
///
/// All variants are treated as transient. Malformed output is
/// not distinguished from an outage.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("network error: {0}")]
  Network(String),

  #[error("request timed out")]
  Timeout,

  #[error("provider returned {status}: {body}")]
  Api { status: u16, body: String },

  #[error("malformed response: {0}")]
  Malformed(String),
}

/// Relationship between two claims as judged by the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
  Supporting,
  Contradicting,
  Unrelated,
}

impl Relationship {
  /// Map a model-produced label. Anything unrecognised is `Unrelated`.
  pub fn from_label(label: &str) -> Self {
    match label.trim().to_ascii_lowercase().as_str() {
      "supporting" => Self::Supporting,
      "contradicting" => Self::Contradicting,
      _ => Self::Unrelated,
    }
  }
}

/// Maps text to fixed-dimension, L2-normalised vectors.
pub trait EmbeddingProvider: Send + Sync {
  /// Dimensionality of every returned vector.
  fn dimensions(&self) -> usize;

  fn embed<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<f32>, ProviderError>> + Send + 'a;

  /// One vector per input, in input order.
  fn embed_batch<'a>(
    &'a self,
    texts: &'a [String],
  ) -> impl Future<Output = Result<Vec<Vec<f32>>, ProviderError>> + Send + 'a;
}

/// The language-model operations the engine depends on. Both enforce a
/// strict JSON contract; output that does not parse is a
/// [`ProviderError::Malformed`].
pub trait LanguageModel: Send + Sync {
  /// Extract explicit claims from article text.
  fn extract_claims<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<NewClaim>, ProviderError>> + Send + 'a;

  /// Judge how `claim_b` relates to `claim_a`.
  fn classify_relationship<'a>(
    &'a self,
    claim_a: &'a str,
    claim_b: &'a str,
  ) -> impl Future<Output = Result<Relationship, ProviderError>> + Send + 'a;
}

//! Error types for `verity-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A vector did not match the dimensionality fixed at index construction.
  #[error("embedding dimension {actual} does not match index dimension {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("vector index cannot issue any more entry ids")]
  IndexExhausted,

  #[error("unknown {kind} label: {label:?}")]
  UnknownLabel { kind: &'static str, label: String },
}

impl Error {
  /// Precondition violations that indicate a programming or deployment
  /// error rather than a transient condition. Never retried.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::DimensionMismatch { .. } | Self::IndexExhausted)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `verity-engine`.

use thiserror::Error;
use uuid::Uuid;
use verity_core::provider::ProviderError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] verity_core::Error),

  #[error("provider error: {0}")]
  Provider(#[from] ProviderError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("article not found: {0}")]
  ArticleNotFound(Uuid),

  #[error("cluster not found: {0}")]
  ClusterNotFound(Uuid),

  #[error("invalid configuration: {0}")]
  Config(String),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// Precondition violations that must abort the run instead of being
  /// logged and skipped.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_fatal())
  }

  /// Failures worth re-running a whole unit of work for.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Provider(_) | Self::Store(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

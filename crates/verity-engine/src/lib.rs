//! The Verity clustering and truth-scoring engine.
//!
//! Wires an [`ArticleStore`](verity_core::store::ArticleStore), an
//! embedding provider and a language model into a periodic pipeline:
//! new articles are placed into topic clusters, then every cluster's claims
//! are grouped, classified and weighed to score article credibility.

pub mod config;
pub mod credibility;
pub mod error;
pub mod feed;
pub mod grouping;
pub mod openai;
pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod stance;
pub mod topic;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineConfig, RunReport};

#[cfg(test)]
mod testing;

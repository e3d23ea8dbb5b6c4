//! The `ArticleStore` trait and the write-sets it commits atomically.
//!
//! The trait is implemented by storage backends (e.g. `verity-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.
//!
//! Per-article and per-cluster work is committed as a single value
//! ([`ArticleAnalysis`], [`ClusterEvaluation`]) so that a backend can apply
//! it inside one transaction: either every row of the unit lands or none do.

use std::future::Future;

use uuid::Uuid;

use crate::{
  article::{Article, NewArticle, NewClaim, SourcedClaim},
  cluster::{ClaimSupport, TruthCluster, Verdict},
};

// ─── Write-sets ──────────────────────────────────────────────────────────────

/// Where an analysed article goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
  /// Join a cluster that already exists.
  Existing(Uuid),
  /// Create a cluster seeded from this article. The seed vector is stored
  /// with the cluster so the in-memory index can be rebuilt after restart.
  New {
    topic_summary: String,
    seed_vector:   Vec<f32>,
  },
}

/// Everything written for one article in one processing cycle.
#[derive(Debug, Clone)]
pub struct ArticleAnalysis {
  pub article_id: Uuid,
  pub placement:  Placement,
  pub claims:     Vec<NewClaim>,
}

/// Everything written for one cluster in one evaluation.
///
/// Committing always deletes the cluster's previous support rows before
/// inserting `supports`, including when `supports` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEvaluation {
  pub cluster_id:  Uuid,
  pub supports:    Vec<ClaimSupport>,
  /// `(article_id, credibility_score)` pairs to overwrite.
  pub credibility: Vec<(Uuid, f64)>,
  /// `None` leaves the cluster's verdict fields untouched.
  pub verdict:     Option<Verdict>,
}

impl ClusterEvaluation {
  pub fn new(cluster_id: Uuid) -> Self {
    Self {
      cluster_id,
      supports: Vec::new(),
      credibility: Vec::new(),
      verdict: None,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Verity article store backend.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait ArticleStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Articles ──────────────────────────────────────────────────────────

  /// Persist a freshly ingested article with zero credibility and no
  /// cluster. Returns `None` without writing if the URL already exists.
  fn insert_article(
    &self,
    input: NewArticle,
  ) -> impl Future<Output = Result<Option<Article>, Self::Error>> + Send + '_;

  fn get_article(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Article>, Self::Error>> + Send + '_;

  /// All articles attached to a cluster, in ingestion order.
  fn cluster_articles(
    &self,
    cluster_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Article>, Self::Error>> + Send + '_;

  /// Atomically place the article (creating its cluster if required) and
  /// record its claims. Returns the id of the cluster the article now
  /// belongs to.
  fn commit_analysis(
    &self,
    analysis: ArticleAnalysis,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  // ── Clusters ──────────────────────────────────────────────────────────

  fn get_cluster(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TruthCluster>, Self::Error>> + Send + '_;

  /// Every cluster id, in creation order.
  fn list_cluster_ids(
    &self,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Seed vectors of every cluster, in creation order.
  fn cluster_vectors(
    &self,
  ) -> impl Future<Output = Result<Vec<(Uuid, Vec<f32>)>, Self::Error>> + Send + '_;

  /// Claims of every article in the cluster, joined with the article's
  /// source, in the order the claims were recorded.
  fn cluster_claims(
    &self,
    cluster_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SourcedClaim>, Self::Error>> + Send + '_;

  // ── Evaluation ────────────────────────────────────────────────────────

  /// Replace the cluster's support rows and apply credibility and verdict
  /// updates in one transaction.
  fn commit_evaluation(
    &self,
    evaluation: ClusterEvaluation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Support rows from the latest evaluation, in insertion order.
  fn cluster_supports(
    &self,
    cluster_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ClaimSupport>, Self::Error>> + Send + '_;
}

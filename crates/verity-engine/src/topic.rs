//! Topic cluster assignment.
//!
//! [`ClusterRegistry`] pairs the in-memory [`VectorIndex`] with the cluster
//! id each entry stands for. It is rebuilt from the stored seed vectors on
//! startup and only grows after the cluster row it describes has committed.

use uuid::Uuid;
use verity_core::{
  article::{Article, NewClaim},
  index::{EntryId, VectorIndex},
  store::{ArticleAnalysis, ArticleStore, Placement},
};

use crate::{Error, Result};

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClusterRegistry {
  index:    VectorIndex,
  /// `clusters[id.0]` is the cluster for index entry `id`.
  clusters: Vec<Uuid>,
}

impl ClusterRegistry {
  pub fn new(dim: usize) -> Self {
    Self { index: VectorIndex::new(dim), clusters: Vec::new() }
  }

  /// Registry holding `entries` in order.
  pub fn rebuild(dim: usize, entries: Vec<(Uuid, Vec<f32>)>) -> Result<Self> {
    let mut registry = Self::new(dim);
    for (cluster_id, vector) in entries {
      registry.register(cluster_id, &vector)?;
    }
    Ok(registry)
  }

  pub fn len(&self) -> usize { self.clusters.len() }

  pub fn is_empty(&self) -> bool { self.clusters.is_empty() }

  pub fn register(&mut self, cluster_id: Uuid, vector: &[f32]) -> Result<()> {
    let EntryId(id) = self.index.add(vector)?;
    debug_assert_eq!(id as usize, self.clusters.len());
    self.clusters.push(cluster_id);
    Ok(())
  }

  /// Best-scoring cluster for `vector`, if any is registered.
  pub fn nearest(&self, vector: &[f32]) -> Result<Option<(Uuid, f32)>> {
    let Some(hit) = self.index.search(vector)? else {
      return Ok(None);
    };
    let cluster_id = usize::try_from(hit.id.0)
      .ok()
      .and_then(|i| self.clusters.get(i))
      .copied()
      .ok_or(verity_core::Error::IndexExhausted)?;
    Ok(Some((cluster_id, hit.score)))
  }
}

// ─── Assignment ──────────────────────────────────────────────────────────────

/// Outcome of comparing an article embedding against the registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopicDecision {
  Join { cluster_id: Uuid, score: f32 },
  Create { best_score: Option<f32> },
}

#[derive(Debug, Clone, Copy)]
pub struct TopicAssigner {
  threshold: f32,
}

impl TopicAssigner {
  pub fn new(threshold: f32) -> Self { Self { threshold } }

  /// Join the nearest cluster when its score reaches the threshold.
  pub fn decide(&self, registry: &ClusterRegistry, embedding: &[f32]) -> Result<TopicDecision> {
    Ok(match registry.nearest(embedding)? {
      Some((cluster_id, score)) if score >= self.threshold => {
        TopicDecision::Join { cluster_id, score }
      }
      other => TopicDecision::Create { best_score: other.map(|(_, s)| s) },
    })
  }

  /// Place `article` without recording claims.
  pub async fn assign_topic_cluster<S: ArticleStore>(
    &self,
    store: &S,
    registry: &mut ClusterRegistry,
    article: &Article,
    embedding: &[f32],
  ) -> Result<Uuid> {
    self
      .assign_with_claims(store, registry, article, embedding, Vec::new())
      .await
  }

  /// Place `article` and record `claims` in one committed unit, then
  /// register a newly created cluster in `registry`.
  pub async fn assign_with_claims<S: ArticleStore>(
    &self,
    store: &S,
    registry: &mut ClusterRegistry,
    article: &Article,
    embedding: &[f32],
    claims: Vec<NewClaim>,
  ) -> Result<Uuid> {
    let placement = match self.decide(registry, embedding)? {
      TopicDecision::Join { cluster_id, score } => {
        tracing::debug!(article_id = %article.article_id, %cluster_id, score, "joining cluster");
        Placement::Existing(cluster_id)
      }
      TopicDecision::Create { best_score } => {
        tracing::debug!(article_id = %article.article_id, ?best_score, "creating cluster");
        Placement::New {
          topic_summary: article.title.clone(),
          seed_vector:   embedding.to_vec(),
        }
      }
    };
    let created = matches!(placement, Placement::New { .. });

    let cluster_id = store
      .commit_analysis(ArticleAnalysis {
        article_id: article.article_id,
        placement,
        claims,
      })
      .await
      .map_err(Error::store)?;

    if created {
      registry.register(cluster_id, embedding)?;
      tracing::info!(article_id = %article.article_id, %cluster_id, "created topic cluster");
    }
    Ok(cluster_id)
  }
}

#[cfg(test)]
mod tests {
  use verity_store_sqlite::SqliteStore;

  use super::*;
  use crate::testing::article;

  async fn stored(store: &SqliteStore, url: &str) -> Article {
    store
      .insert_article(article(url, "A", "Body"))
      .await
      .unwrap()
      .expect("fresh url")
  }

  #[test]
  fn empty_registry_always_creates() {
    let registry = ClusterRegistry::new(2);
    let decision = TopicAssigner::new(0.0).decide(&registry, &[1.0, 0.0]).unwrap();
    assert_eq!(decision, TopicDecision::Create { best_score: None });
  }

  #[tokio::test]
  async fn threshold_is_inclusive() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut registry = ClusterRegistry::new(2);
    let assigner = TopicAssigner::new(0.6);

    let first = stored(&store, "https://a.example/1").await;
    let seed = assigner
      .assign_topic_cluster(&store, &mut registry, &first, &[1.0, 0.0])
      .await
      .unwrap();

    // Normalises to [0.6, 0.8], scoring exactly 0.6 against the seed.
    let second = stored(&store, "https://a.example/2").await;
    let joined = assigner
      .assign_topic_cluster(&store, &mut registry, &second, &[3.0, 4.0])
      .await
      .unwrap();
    assert_eq!(joined, seed);
    assert_eq!(registry.len(), 1);

    // Scores 5/13 against the seed.
    let third = stored(&store, "https://a.example/3").await;
    let created = assigner
      .assign_topic_cluster(&store, &mut registry, &third, &[5.0, 12.0])
      .await
      .unwrap();
    assert_ne!(created, seed);
    assert_eq!(registry.len(), 2);
    assert_eq!(store.list_cluster_ids().await.unwrap(), vec![seed, created]);
    assert_eq!(store.cluster_vectors().await.unwrap()[1].1, vec![5.0, 12.0]);
  }
}

//! One end-to-end pipeline run: ingest, analyse each new article, then
//! re-evaluate every cluster.
//!
//! Articles are processed one at a time and each is its own unit of work;
//! cluster evaluation starts only once every article has been handled.
//! Failed units are retried with the unit policy, then logged and skipped.
//! Fatal errors end the run.

use tracing::{error, info, warn};
use uuid::Uuid;
use verity_core::{
  provider::{EmbeddingProvider, LanguageModel, Relationship},
  store::ArticleStore,
};

use crate::{
  Error,
  Result,
  config::{Settings, Thresholds},
  credibility::{ClusterOutcome, Evaluator, SourceTrust},
  feed::ArticleFeed,
  retry::{RetryPolicy, retry},
  stance::compare_claims,
  topic::{ClusterRegistry, TopicAssigner},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
  pub thresholds: Thresholds,
  pub unit_retry: RetryPolicy,
}

impl PipelineConfig {
  pub fn from_settings(settings: &Settings) -> Self {
    Self {
      thresholds: settings.thresholds,
      unit_retry: settings.unit_retry,
    }
  }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  pub fetched:         usize,
  pub inserted:        usize,
  pub duplicates:      usize,
  pub processed:       usize,
  pub failed_articles: usize,
  pub evaluated:       usize,
  pub failed_clusters: usize,
}

pub struct Pipeline<S, E, L, F> {
  store:    S,
  embedder: E,
  llm:      L,
  feed:     F,
  registry: ClusterRegistry,
  assigner: TopicAssigner,
  trust:    SourceTrust,
  config:   PipelineConfig,
}

impl<S, E, L, F> Pipeline<S, E, L, F>
where
  S: ArticleStore,
  E: EmbeddingProvider,
  L: LanguageModel,
  F: ArticleFeed,
{
  /// Build a pipeline, rebuilding the cluster index from stored seed
  /// vectors.
  pub async fn new(
    store: S,
    embedder: E,
    llm: L,
    feed: F,
    trust: SourceTrust,
    config: PipelineConfig,
  ) -> Result<Self> {
    let entries = store.cluster_vectors().await.map_err(Error::store)?;
    let registry = ClusterRegistry::rebuild(embedder.dimensions(), entries)?;
    info!(clusters = registry.len(), "rebuilt cluster index");
    Ok(Self {
      store,
      embedder,
      llm,
      feed,
      registry,
      assigner: TopicAssigner::new(config.thresholds.topic),
      trust,
      config,
    })
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn registry(&self) -> &ClusterRegistry { &self.registry }

  pub fn llm(&self) -> &L { &self.llm }

  fn evaluator(&self) -> Evaluator<'_, S, E, L> {
    Evaluator {
      store:              &self.store,
      embedder:           &self.embedder,
      llm:                &self.llm,
      trust:              &self.trust,
      grouping_threshold: self.config.thresholds.grouping,
    }
  }

  // ─── Units of work ──────────────────────────────────────────────────────

  /// Extract claims, embed, and place one stored article. Returns the
  /// cluster it was attached to.
  pub async fn process_article(&mut self, article_id: Uuid) -> Result<Uuid> {
    let article = self
      .store
      .get_article(article_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ArticleNotFound(article_id))?;

    let claims = self.llm.extract_claims(&article.content).await?;
    let embedding = self.embedder.embed(article.embedding_text()).await?;

    self
      .assigner
      .assign_with_claims(&self.store, &mut self.registry, &article, &embedding, claims)
      .await
  }

  pub async fn evaluate_cluster(&self, cluster_id: Uuid) -> Result<ClusterOutcome> {
    self.evaluator().evaluate_cluster(cluster_id).await
  }

  /// Pairwise relationships between the cluster's claims.
  pub async fn compare_cluster(&self, cluster_id: Uuid) -> Result<Vec<(Uuid, Relationship)>> {
    if self.store.get_cluster(cluster_id).await.map_err(Error::store)?.is_none() {
      return Err(Error::ClusterNotFound(cluster_id));
    }
    let claims: Vec<_> = self
      .store
      .cluster_claims(cluster_id)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|c| c.claim)
      .collect();
    compare_claims(
      &self.embedder,
      &self.llm,
      &claims,
      self.config.thresholds.comparison,
    )
    .await
  }

  // Each attempt borrows `self` mutably, so this does not go through
  // [`retry`].
  async fn process_with_retry(&mut self, article_id: Uuid) -> Result<Uuid> {
    let policy = self.config.unit_retry;
    let mut attempt = 1;
    loop {
      match self.process_article(article_id).await {
        Ok(cluster_id) => return Ok(cluster_id),
        Err(e) if policy.allows_retry(attempt) && e.is_retryable() => {
          let delay = policy.delay_after(attempt);
          warn!(
            %article_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "article processing failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn evaluate_with_retry(&self, cluster_id: Uuid) -> Result<ClusterOutcome> {
    retry(
      &self.config.unit_retry,
      "evaluate_cluster",
      Error::is_retryable,
      move |_| self.evaluate_cluster(cluster_id),
    )
    .await
  }

  // ─── Run ────────────────────────────────────────────────────────────────

  pub async fn run_once(&mut self) -> Result<RunReport> {
    info!("pipeline started");
    let mut report = RunReport::default();

    let incoming = match self.feed.fetch().await {
      Ok(articles) => articles,
      Err(e) => {
        error!(error = %e, "article feed failed");
        return Ok(report);
      }
    };
    report.fetched = incoming.len();
    if incoming.is_empty() {
      info!("pipeline completed, no articles fetched");
      return Ok(report);
    }

    let mut article_ids = Vec::new();
    for article in incoming {
      let url = article.url.clone();
      match self.store.insert_article(article).await {
        Ok(Some(saved)) => article_ids.push(saved.article_id),
        Ok(None) => report.duplicates += 1,
        Err(e) => error!(%url, error = %e, "failed to save article"),
      }
    }
    report.inserted = article_ids.len();
    info!(count = report.inserted, duplicates = report.duplicates, "articles saved");

    for article_id in article_ids {
      info!(%article_id, "processing article");
      match self.process_with_retry(article_id).await {
        Ok(cluster_id) => {
          report.processed += 1;
          info!(%article_id, %cluster_id, "article processed");
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
          report.failed_articles += 1;
          error!(%article_id, error = %e, "article processing failed");
        }
      }
    }

    let cluster_ids = self.store.list_cluster_ids().await.map_err(Error::store)?;
    info!(count = cluster_ids.len(), "evaluating clusters");
    for cluster_id in cluster_ids {
      match self.evaluate_with_retry(cluster_id).await {
        Ok(outcome) => {
          report.evaluated += 1;
          info!(
            %cluster_id,
            claims = outcome.claims,
            groups = outcome.groups,
            confidence = outcome.verdict.as_ref().map(|v| v.confidence_score),
            "cluster evaluated"
          );
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
          report.failed_clusters += 1;
          error!(%cluster_id, error = %e, "cluster evaluation failed");
        }
      }
    }

    info!(
      processed = report.processed,
      failed_articles = report.failed_articles,
      evaluated = report.evaluated,
      failed_clusters = report.failed_clusters,
      "pipeline completed"
    );
    Ok(report)
  }
}

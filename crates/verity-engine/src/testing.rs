//! In-process fakes for the engine's collaborators.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
  },
};

use verity_core::{
  article::{ClaimType, NewArticle, NewClaim, Sentiment},
  provider::{EmbeddingProvider, LanguageModel, ProviderError, Relationship},
};

use crate::{Result, feed::ArticleFeed};

// ─── Embeddings ──────────────────────────────────────────────────────────────

/// Looks each text up in a fixed table. Unknown text is a malformed
/// response.
pub struct TableEmbedder {
  dim:           usize,
  vectors:       HashMap<String, Vec<f32>>,
  /// Drop the last vector of every batch.
  short_batches: bool,
}

impl TableEmbedder {
  pub fn new(dim: usize) -> Self {
    Self { dim, vectors: HashMap::new(), short_batches: false }
  }

  pub fn short_batches(mut self) -> Self {
    self.short_batches = true;
    self
  }

  pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
    self.vectors.insert(text.to_string(), vector);
    self
  }

  fn lookup(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
    self
      .vectors
      .get(text)
      .cloned()
      .ok_or_else(|| ProviderError::Malformed(format!("no vector for {text:?}")))
  }
}

impl EmbeddingProvider for TableEmbedder {
  fn dimensions(&self) -> usize { self.dim }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> { self.lookup(text) }

  async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
    let mut vectors: Vec<_> = texts.iter().map(|t| self.lookup(t)).collect::<Result<_, _>>()?;
    if self.short_batches {
      vectors.pop();
    }
    Ok(vectors)
  }
}

// ─── Language model ──────────────────────────────────────────────────────────

/// Returns scripted claims and relationship labels.
#[derive(Default)]
pub struct ScriptedLlm {
  claims:           HashMap<String, Vec<NewClaim>>,
  labels:           HashMap<(String, String), String>,
  /// Extraction calls that fail with malformed output before succeeding.
  extract_failures:  AtomicU32,
  /// Classification calls that time out before succeeding.
  classify_failures: AtomicU32,
  pub extract_calls:  AtomicU32,
  pub classify_calls: AtomicU32,
}

impl ScriptedLlm {
  pub fn new() -> Self { Self::default() }

  pub fn claims(mut self, content: &str, texts: &[&str]) -> Self {
    let claims = texts
      .iter()
      .map(|t| NewClaim {
        claim_text: t.to_string(),
        claim_type: ClaimType::Fact,
        sentiment:  Sentiment::Neutral,
      })
      .collect();
    self.claims.insert(content.to_string(), claims);
    self
  }

  /// Raw label the model gives for `(anchor, other)`. Unscripted pairs are
  /// `supporting`.
  pub fn label(mut self, anchor: &str, other: &str, label: &str) -> Self {
    self
      .labels
      .insert((anchor.to_string(), other.to_string()), label.to_string());
    self
  }

  pub fn failing_extractions(self, n: u32) -> Self {
    self.extract_failures.store(n, Ordering::SeqCst);
    self
  }

  pub fn failing_classifications(self, n: u32) -> Self {
    self.classify_failures.store(n, Ordering::SeqCst);
    self
  }
}

impl LanguageModel for ScriptedLlm {
  async fn extract_claims(&self, text: &str) -> Result<Vec<NewClaim>, ProviderError> {
    self.extract_calls.fetch_add(1, Ordering::SeqCst);
    let pending = self.extract_failures.load(Ordering::SeqCst);
    if pending > 0 {
      self.extract_failures.store(pending - 1, Ordering::SeqCst);
      return Err(ProviderError::Malformed("not json".into()));
    }
    Ok(self.claims.get(text).cloned().unwrap_or_default())
  }

  async fn classify_relationship(
    &self,
    claim_a: &str,
    claim_b: &str,
  ) -> Result<Relationship, ProviderError> {
    self.classify_calls.fetch_add(1, Ordering::SeqCst);
    let pending = self.classify_failures.load(Ordering::SeqCst);
    if pending > 0 {
      self.classify_failures.store(pending - 1, Ordering::SeqCst);
      return Err(ProviderError::Timeout);
    }
    let label = self
      .labels
      .get(&(claim_a.to_string(), claim_b.to_string()))
      .map(String::as_str)
      .unwrap_or("supporting");
    Ok(Relationship::from_label(label))
  }
}

// ─── Feed ────────────────────────────────────────────────────────────────────

/// Returns the same batch on every fetch.
#[derive(Default)]
pub struct StaticFeed {
  articles: Mutex<Vec<NewArticle>>,
}

impl StaticFeed {
  pub fn new(articles: Vec<NewArticle>) -> Self { Self { articles: Mutex::new(articles) } }
}

impl ArticleFeed for StaticFeed {
  async fn fetch(&self) -> Result<Vec<NewArticle>> { Ok(self.articles.lock().unwrap().clone()) }
}

pub fn article(url: &str, source: &str, content: &str) -> NewArticle {
  NewArticle {
    url:          url.into(),
    title:        format!("Headline {url}"),
    content:      content.into(),
    publish_date: None,
    source:       source.into(),
    country:      None,
  }
}

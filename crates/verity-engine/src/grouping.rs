//! Semantic grouping of a cluster's claims.

use verity_core::{
  article::SourcedClaim,
  grouping::{Group, semantic_groups},
  provider::{EmbeddingProvider, ProviderError},
};

use crate::Result;

/// Above this many claims the quadratic pair scan gets slow.
pub const LARGE_CLUSTER_CLAIMS: usize = 300;

/// Embed every claim text in one batch and group by similarity.
pub async fn group_claims<E: EmbeddingProvider>(
  embedder: &E,
  claims: Vec<SourcedClaim>,
  threshold: f32,
) -> Result<Vec<Group<SourcedClaim>>> {
  if claims.len() > LARGE_CLUSTER_CLAIMS {
    tracing::warn!(claims = claims.len(), "grouping a large cluster");
  }
  let texts: Vec<String> = claims.iter().map(|c| c.claim.claim_text.clone()).collect();
  let vectors = embed_all(embedder, &texts).await?;
  Ok(semantic_groups(claims, &vectors, threshold)?)
}

/// Batch-embed `texts`, rejecting a response with the wrong number of
/// vectors as malformed.
pub async fn embed_all<E: EmbeddingProvider>(
  embedder: &E,
  texts: &[String],
) -> Result<Vec<Vec<f32>>> {
  let vectors = embedder.embed_batch(texts).await?;
  if vectors.len() != texts.len() {
    return Err(
      ProviderError::Malformed(format!(
        "expected {} embeddings, got {}",
        texts.len(),
        vectors.len()
      ))
      .into(),
    );
  }
  Ok(vectors)
}

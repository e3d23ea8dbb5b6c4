//! Stance classification within a claim group, and the pairwise comparison
//! diagnostic.

use uuid::Uuid;
use verity_core::{
  article::{Claim, SourcedClaim},
  index::cosine_similarity,
  provider::{EmbeddingProvider, LanguageModel, Relationship},
};

use crate::{Result, grouping::embed_all};

/// The two sides of a classified group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stances {
  pub supporting:    Vec<SourcedClaim>,
  pub contradicting: Vec<SourcedClaim>,
}

/// The first claim anchors the group and is supporting. Every other claim is
/// contradicting only if the model says so.
pub async fn classify_group<L: LanguageModel>(
  llm: &L,
  group: Vec<SourcedClaim>,
) -> Result<Stances> {
  let mut members = group.into_iter();
  let Some(anchor) = members.next() else {
    return Ok(Stances::default());
  };

  let mut stances = Stances::default();
  for claim in members {
    let relationship = llm
      .classify_relationship(&anchor.claim.claim_text, &claim.claim.claim_text)
      .await?;
    match relationship {
      Relationship::Contradicting => stances.contradicting.push(claim),
      Relationship::Supporting | Relationship::Unrelated => stances.supporting.push(claim),
    }
  }
  stances.supporting.insert(0, anchor);
  Ok(stances)
}

/// Ask the model about every pair of claims at least `threshold` similar,
/// and report each claim with the relationships it took part in.
pub async fn compare_claims<E, L>(
  embedder: &E,
  llm: &L,
  claims: &[Claim],
  threshold: f32,
) -> Result<Vec<(Uuid, Relationship)>>
where
  E: EmbeddingProvider,
  L: LanguageModel,
{
  if claims.len() < 2 {
    return Ok(Vec::new());
  }
  let texts: Vec<String> = claims.iter().map(|c| c.claim_text.clone()).collect();
  let vectors = embed_all(embedder, &texts).await?;

  let mut results: Vec<(Uuid, Relationship)> = Vec::new();
  for i in 0..claims.len() {
    for j in (i + 1)..claims.len() {
      if cosine_similarity(&vectors[i], &vectors[j])? < threshold {
        continue;
      }
      let relationship = llm
        .classify_relationship(&claims[i].claim_text, &claims[j].claim_text)
        .await?;
      if relationship == Relationship::Unrelated {
        continue;
      }
      for id in [claims[i].claim_id, claims[j].claim_id] {
        if !results.contains(&(id, relationship)) {
          results.push((id, relationship));
        }
      }
    }
  }
  Ok(results)
}

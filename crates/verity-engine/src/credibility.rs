//! Cluster evaluation: weigh each group's sides by source trust, record the
//! winners, and derive article credibility and the cluster verdict.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use verity_core::{
  article::SourcedClaim,
  cluster::{ClaimSupport, SupportType, Verdict, VerdictLabel},
  provider::{EmbeddingProvider, LanguageModel},
  store::{ArticleStore, ClusterEvaluation},
};

use crate::{
  Error,
  Result,
  config::SourceSettings,
  grouping::group_claims,
  stance::{Stances, classify_group},
};

/// Weight of a configured source that does not state one.
pub const DEFAULT_SOURCE_WEIGHT: f64 = 0.5;

// ─── Source trust ────────────────────────────────────────────────────────────

/// Static source name to weight table. Unknown sources weigh nothing.
#[derive(Debug, Clone, Default)]
pub struct SourceTrust {
  weights: HashMap<String, f64>,
}

impl SourceTrust {
  pub fn new(weights: impl IntoIterator<Item = (String, f64)>) -> Self {
    Self { weights: weights.into_iter().collect() }
  }

  pub fn from_sources(sources: &[SourceSettings]) -> Self {
    Self::new(
      sources
        .iter()
        .map(|s| (s.name.clone(), s.credibility.unwrap_or(DEFAULT_SOURCE_WEIGHT))),
    )
  }

  pub fn weight(&self, source: &str) -> f64 { self.weights.get(source).copied().unwrap_or(0.0) }

  /// Summed weight of the sources behind `claims`, one term per claim.
  pub fn total(&self, claims: &[SourcedClaim]) -> f64 {
    claims.iter().map(|c| self.weight(&c.source)).sum()
  }
}

/// The heavier side of a group. Equal weights favour the supporting side.
pub fn resolve_group(trust: &SourceTrust, stances: Stances) -> (SupportType, Vec<SourcedClaim>) {
  if trust.total(&stances.supporting) >= trust.total(&stances.contradicting) {
    (SupportType::Supporting, stances.supporting)
  } else {
    (SupportType::Contradicting, stances.contradicting)
  }
}

// ─── Write-set builders ──────────────────────────────────────────────────────

/// Record every claim in `claims` with the same tag.
pub fn save_supports(
  evaluation: &mut ClusterEvaluation,
  claims: &[SourcedClaim],
  support_type: SupportType,
) {
  let cluster_id = evaluation.cluster_id;
  evaluation.supports.extend(claims.iter().map(|c| ClaimSupport {
    cluster_id,
    claim_id: c.claim.claim_id,
    support_type,
  }));
}

/// Set each article's credibility to the fraction of its claims in the
/// cluster that are in `truth_claim_ids`. Articles are listed in order of
/// their first claim.
pub fn update_article_credibility(
  evaluation: &mut ClusterEvaluation,
  cluster_claims: &[SourcedClaim],
  truth_claim_ids: &HashSet<Uuid>,
) {
  let mut tallies: Vec<(Uuid, usize, usize)> = Vec::new();
  for c in cluster_claims {
    let truth = usize::from(truth_claim_ids.contains(&c.claim.claim_id));
    match tallies.iter_mut().find(|(id, ..)| *id == c.claim.article_id) {
      Some((_, truths, total)) => {
        *truths += truth;
        *total += 1;
      }
      None => tallies.push((c.claim.article_id, truth, 1)),
    }
  }
  evaluation.credibility = tallies
    .into_iter()
    .map(|(id, truths, total)| (id, truths as f64 / total as f64))
    .collect();
}

/// Mean credibility over the cluster's claims, labelled and summarised.
pub fn derive_verdict(cluster_claims: &[SourcedClaim], evaluation: &ClusterEvaluation) -> Verdict {
  let credibility: HashMap<Uuid, f64> = evaluation.credibility.iter().copied().collect();
  let sum: f64 = cluster_claims
    .iter()
    .map(|c| credibility.get(&c.claim.article_id).copied().unwrap_or(0.0))
    .sum();
  let mean = if cluster_claims.is_empty() { 0.0 } else { sum / cluster_claims.len() as f64 };
  let confidence_score = (mean * 1000.0).round() / 1000.0;
  let label = VerdictLabel::from_confidence(confidence_score);

  let articles = credibility.len();
  let count = |tag| evaluation.supports.iter().filter(|s| s.support_type == tag).count();
  let final_truth_summary = format!(
    "{}. Weighted evidence from {articles} articles: {} supporting, {} contradicting.",
    label.as_phrase(),
    count(SupportType::Supporting),
    count(SupportType::Contradicting),
  );

  Verdict { label, confidence_score, final_truth_summary }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Summary of one cluster evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
  pub cluster_id:  Uuid,
  pub claims:      usize,
  pub groups:      usize,
  pub truth_count: usize,
  pub verdict:     Option<Verdict>,
}

/// The collaborators an evaluation needs.
pub struct Evaluator<'a, S, E, L> {
  pub store:              &'a S,
  pub embedder:           &'a E,
  pub llm:                &'a L,
  pub trust:              &'a SourceTrust,
  pub grouping_threshold: f32,
}

impl<S, E, L> Evaluator<'_, S, E, L>
where
  S: ArticleStore,
  E: EmbeddingProvider,
  L: LanguageModel,
{
  /// Recompute supports, credibility and verdict for one cluster and commit
  /// them together. Clusters with fewer than two claims only have their
  /// supports cleared.
  pub async fn evaluate_cluster(&self, cluster_id: Uuid) -> Result<ClusterOutcome> {
    if self.store.get_cluster(cluster_id).await.map_err(Error::store)?.is_none() {
      return Err(Error::ClusterNotFound(cluster_id));
    }
    let claims = self.store.cluster_claims(cluster_id).await.map_err(Error::store)?;
    let mut evaluation = ClusterEvaluation::new(cluster_id);
    let mut outcome = ClusterOutcome {
      cluster_id,
      claims: claims.len(),
      groups: 0,
      truth_count: 0,
      verdict: None,
    };

    if claims.len() < 2 {
      self.store.commit_evaluation(evaluation).await.map_err(Error::store)?;
      return Ok(outcome);
    }

    let groups = group_claims(self.embedder, claims.clone(), self.grouping_threshold).await?;
    let mut truth_claim_ids = HashSet::new();
    for group in groups.into_iter().filter(|g| g.members.len() >= 2) {
      outcome.groups += 1;
      let stances = classify_group(self.llm, group.members).await?;
      let (side, winners) = resolve_group(self.trust, stances);
      truth_claim_ids.extend(winners.iter().map(|c| c.claim.claim_id));
      save_supports(&mut evaluation, &winners, side);
    }

    update_article_credibility(&mut evaluation, &claims, &truth_claim_ids);
    let verdict = derive_verdict(&claims, &evaluation);
    evaluation.verdict = Some(verdict.clone());
    outcome.truth_count = truth_claim_ids.len();
    outcome.verdict = Some(verdict);

    self.store.commit_evaluation(evaluation).await.map_err(Error::store)?;
    Ok(outcome)
  }
}

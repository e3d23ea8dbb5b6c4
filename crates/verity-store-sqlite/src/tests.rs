//! Integration tests for `SqliteStore` against an in-memory database.

use uuid::Uuid;
use verity_core::{
  article::{ClaimType, NewArticle, NewClaim, Sentiment},
  cluster::{ClaimSupport, SupportType, Verdict, VerdictLabel},
  store::{ArticleAnalysis, ArticleStore, ClusterEvaluation, Placement},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_article(url: &str, source: &str) -> NewArticle {
  NewArticle {
    url:          url.into(),
    title:        format!("Title of {url}"),
    content:      "Body text".into(),
    publish_date: None,
    source:       source.into(),
    country:      Some("JP".into()),
  }
}

fn claim(text: &str) -> NewClaim {
  NewClaim {
    claim_text: text.into(),
    claim_type: ClaimType::Fact,
    sentiment:  Sentiment::Neutral,
  }
}

fn new_cluster(summary: &str) -> Placement {
  Placement::New {
    topic_summary: summary.into(),
    seed_vector:   vec![1.0, 0.0, 0.0],
  }
}

// ─── Articles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_article() {
  let s = store().await;

  let article = s
    .insert_article(new_article("https://a.example/1", "Reuters"))
    .await
    .unwrap()
    .expect("fresh url is inserted");
  assert_eq!(article.credibility_score, 0.0);
  assert!(article.topic_cluster_id.is_none());

  let fetched = s.get_article(article.article_id).await.unwrap().unwrap();
  assert_eq!(fetched.url, "https://a.example/1");
  assert_eq!(fetched.source, "Reuters");
  assert_eq!(fetched.country.as_deref(), Some("JP"));
}

#[tokio::test]
async fn duplicate_url_is_skipped() {
  let s = store().await;
  s.insert_article(new_article("https://a.example/1", "Reuters"))
    .await
    .unwrap()
    .unwrap();

  let again = s
    .insert_article(new_article("https://a.example/1", "Other"))
    .await
    .unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn get_article_missing_returns_none() {
  let s = store().await;
  assert!(s.get_article(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Analysis ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_analysis_creates_cluster_and_claims() {
  let s = store().await;
  let article = s
    .insert_article(new_article("https://a.example/1", "Reuters"))
    .await
    .unwrap()
    .unwrap();

  let cluster_id = s
    .commit_analysis(ArticleAnalysis {
      article_id: article.article_id,
      placement:  new_cluster("Election results"),
      claims:     vec![claim("Turnout was 60%"), claim("The count finished late")],
    })
    .await
    .unwrap();

  let cluster = s.get_cluster(cluster_id).await.unwrap().unwrap();
  assert_eq!(cluster.topic_summary, "Election results");
  assert!(cluster.final_truth_summary.is_none());

  let fetched = s.get_article(article.article_id).await.unwrap().unwrap();
  assert_eq!(fetched.topic_cluster_id, Some(cluster_id));

  let claims = s.cluster_claims(cluster_id).await.unwrap();
  let texts: Vec<_> = claims.iter().map(|c| c.claim.claim_text.as_str()).collect();
  assert_eq!(texts, ["Turnout was 60%", "The count finished late"]);
  assert!(claims.iter().all(|c| c.source == "Reuters"));

  let vectors = s.cluster_vectors().await.unwrap();
  assert_eq!(vectors, vec![(cluster_id, vec![1.0, 0.0, 0.0])]);
}

#[tokio::test]
async fn commit_analysis_joins_existing_cluster() {
  let s = store().await;
  let first = s
    .insert_article(new_article("https://a.example/1", "Reuters"))
    .await
    .unwrap()
    .unwrap();
  let second = s
    .insert_article(new_article("https://b.example/1", "AP"))
    .await
    .unwrap()
    .unwrap();

  let cluster_id = s
    .commit_analysis(ArticleAnalysis {
      article_id: first.article_id,
      placement:  new_cluster("Storm"),
      claims:     vec![claim("Winds reached 150km/h")],
    })
    .await
    .unwrap();
  let joined = s
    .commit_analysis(ArticleAnalysis {
      article_id: second.article_id,
      placement:  Placement::Existing(cluster_id),
      claims:     vec![claim("Winds peaked at 150km/h")],
    })
    .await
    .unwrap();

  assert_eq!(joined, cluster_id);
  assert_eq!(s.list_cluster_ids().await.unwrap(), vec![cluster_id]);
  assert_eq!(s.cluster_articles(cluster_id).await.unwrap().len(), 2);
  let sources: Vec<_> = s
    .cluster_claims(cluster_id)
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.source)
    .collect();
  assert_eq!(sources, ["Reuters", "AP"]);
}

#[tokio::test]
async fn commit_analysis_for_unknown_article_rolls_back() {
  let s = store().await;
  let err = s
    .commit_analysis(ArticleAnalysis {
      article_id: Uuid::new_v4(),
      placement:  new_cluster("Orphan"),
      claims:     vec![claim("Nothing")],
    })
    .await
    .unwrap_err();

  assert!(matches!(err, crate::Error::ArticleNotFound(_)));
  assert!(s.list_cluster_ids().await.unwrap().is_empty());
  assert!(s.cluster_vectors().await.unwrap().is_empty());
}

#[tokio::test]
async fn reprocessing_replaces_previous_claims() {
  let s = store().await;
  let article = s
    .insert_article(new_article("https://a.example/1", "Reuters"))
    .await
    .unwrap()
    .unwrap();
  let cluster_id = s
    .commit_analysis(ArticleAnalysis {
      article_id: article.article_id,
      placement:  new_cluster("Topic"),
      claims:     vec![claim("old one"), claim("old two")],
    })
    .await
    .unwrap();
  s.commit_analysis(ArticleAnalysis {
    article_id: article.article_id,
    placement:  Placement::Existing(cluster_id),
    claims:     vec![claim("new")],
  })
  .await
  .unwrap();

  let claims = s.cluster_claims(cluster_id).await.unwrap();
  assert_eq!(claims.len(), 1);
  assert_eq!(claims[0].claim.claim_text, "new");
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_evaluation_replaces_supports_and_scores() {
  let s = store().await;
  let article = s
    .insert_article(new_article("https://a.example/1", "Reuters"))
    .await
    .unwrap()
    .unwrap();
  let cluster_id = s
    .commit_analysis(ArticleAnalysis {
      article_id: article.article_id,
      placement:  new_cluster("Topic"),
      claims:     vec![claim("one"), claim("two")],
    })
    .await
    .unwrap();
  let claims = s.cluster_claims(cluster_id).await.unwrap();

  let mut first = ClusterEvaluation::new(cluster_id);
  first.supports = claims
    .iter()
    .map(|c| ClaimSupport {
      cluster_id,
      claim_id: c.claim.claim_id,
      support_type: SupportType::Supporting,
    })
    .collect();
  first.credibility = vec![(article.article_id, 1.0)];
  first.verdict = Some(Verdict {
    label:               VerdictLabel::HighlyLikelyTrue,
    confidence_score:    1.0,
    final_truth_summary: "Highly likely true.".into(),
  });
  s.commit_evaluation(first).await.unwrap();

  assert_eq!(s.cluster_supports(cluster_id).await.unwrap().len(), 2);
  let cluster = s.get_cluster(cluster_id).await.unwrap().unwrap();
  assert_eq!(cluster.confidence_score, Some(1.0));
  assert!(cluster.evaluated_at.is_some());

  // An empty write-set clears supports but leaves the verdict alone.
  s.commit_evaluation(ClusterEvaluation::new(cluster_id))
    .await
    .unwrap();
  assert!(s.cluster_supports(cluster_id).await.unwrap().is_empty());
  let cluster = s.get_cluster(cluster_id).await.unwrap().unwrap();
  assert_eq!(cluster.final_truth_summary.as_deref(), Some("Highly likely true."));

  let fetched = s.get_article(article.article_id).await.unwrap().unwrap();
  assert_eq!(fetched.credibility_score, 1.0);
}

#[tokio::test]
async fn commit_evaluation_for_unknown_cluster_errors() {
  let s = store().await;
  let err = s
    .commit_evaluation(ClusterEvaluation::new(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ClusterNotFound(_)));
}

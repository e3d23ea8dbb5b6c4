//! OpenAI-compatible HTTP implementations of [`EmbeddingProvider`] and
//! [`LanguageModel`].
//!
//! Every request carries a timeout and is retried with the configured
//! provider policy. Responses that do not satisfy the JSON contract are
//! reported as [`ProviderError::Malformed`] and retried like any other
//! failure.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use verity_core::{
  article::NewClaim,
  index::normalize,
  provider::{EmbeddingProvider, LanguageModel, ProviderError, Relationship},
};

use crate::{
  Error,
  Result,
  config::{EmbeddingSettings, LlmSettings},
  retry::{RetryPolicy, retry},
};

const SYSTEM_PROMPT: &str = "You are an information extraction engine. Respond with valid JSON \
                             only, without explanations or markdown.";

const EXTRACT_PROMPT: &str = "Extract the explicit claims made in the text. Respond with a JSON \
                              array whose items have: claim_text (string), claim_type (fact | \
                              prediction | opinion | speculation), sentiment (positive | negative \
                              | neutral).";

const RELATIONSHIP_PROMPT: &str = "Decide how CLAIM B relates to CLAIM A. Respond with a JSON \
                                   object {\"relationship\": \"supporting\" | \"contradicting\" \
                                   | \"unrelated\"}.";

fn http_client(timeout_secs: u64) -> Result<Client> {
  Client::builder()
    .timeout(Duration::from_secs(timeout_secs))
    .build()
    .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

fn transport_error(e: reqwest::Error) -> ProviderError {
  if e.is_timeout() {
    ProviderError::Timeout
  } else {
    ProviderError::Network(e.to_string())
  }
}

/// POST `body` as JSON and decode a successful JSON response.
async fn post_json<B, R>(
  http: &Client,
  url: &str,
  api_key: &str,
  body: &B,
) -> Result<R, ProviderError>
where
  B: Serialize + ?Sized,
  R: for<'de> Deserialize<'de>,
{
  let resp = http
    .post(url)
    .bearer_auth(api_key)
    .json(body)
    .send()
    .await
    .map_err(transport_error)?;

  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(ProviderError::Api { status: status.as_u16(), body });
  }

  let text = resp.text().await.map_err(transport_error)?;
  serde_json::from_str(&text).map_err(|e| ProviderError::Malformed(e.to_string()))
}

// ─── Embeddings ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
  index:     usize,
  embedding: Vec<f32>,
}

/// Embedding client for the `/embeddings` endpoint.
pub struct OpenAiEmbedder {
  http:       Client,
  url:        String,
  api_key:    String,
  model:      String,
  dimensions: usize,
  retry:      RetryPolicy,
}

impl OpenAiEmbedder {
  pub fn new(settings: &EmbeddingSettings, retry: RetryPolicy) -> Result<Self> {
    Ok(Self {
      http: http_client(settings.timeout_secs)?,
      url: format!("{}/embeddings", settings.base_url.trim_end_matches('/')),
      api_key: settings.api_key.clone(),
      model: settings.model.clone(),
      dimensions: settings.dimensions,
      retry,
    })
  }

  async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
    let body = EmbeddingRequest { model: &self.model, input: texts };
    let resp: EmbeddingResponse = post_json(&self.http, &self.url, &self.api_key, &body).await?;
    into_vectors(resp, texts.len())
  }
}

/// Order vectors by their `index`, check the count, and normalise each.
fn into_vectors(resp: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
  let mut data = resp.data;
  if data.len() != expected {
    return Err(ProviderError::Malformed(format!(
      "expected {expected} embeddings, got {}",
      data.len()
    )));
  }
  data.sort_by_key(|d| d.index);
  Ok(
    data
      .into_iter()
      .map(|d| {
        let mut v = d.embedding;
        normalize(&mut v);
        v
      })
      .collect(),
  )
}

impl EmbeddingProvider for OpenAiEmbedder {
  fn dimensions(&self) -> usize { self.dimensions }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
    let input = [text.to_string()];
    let mut vectors = self.embed_batch(&input).await?;
    vectors
      .pop()
      .ok_or_else(|| ProviderError::Malformed("empty embedding response".into()))
  }

  async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
    if texts.is_empty() {
      return Ok(Vec::new());
    }
    retry(&self.retry, "embed", |_| true, move |_| self.request(texts)).await
  }
}

// ─── Chat ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:       &'a str,
  temperature: f32,
  messages:    [Message<'a>; 2],
}

#[derive(Serialize)]
struct Message<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

/// Chat-completions client that enforces JSON-only answers.
pub struct OpenAiChat {
  http:        Client,
  url:         String,
  api_key:     String,
  model:       String,
  temperature: f32,
  retry:       RetryPolicy,
}

impl OpenAiChat {
  pub fn new(settings: &LlmSettings, retry: RetryPolicy) -> Result<Self> {
    Ok(Self {
      http: http_client(settings.timeout_secs)?,
      url: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
      api_key: settings.api_key.clone(),
      model: settings.model.clone(),
      temperature: settings.temperature,
      retry,
    })
  }

  /// One completion, returned as raw message text.
  async fn complete(&self, user: &str) -> Result<String, ProviderError> {
    let body = ChatRequest {
      model:       &self.model,
      temperature: self.temperature,
      messages:    [
        Message { role: "system", content: SYSTEM_PROMPT },
        Message { role: "user", content: user },
      ],
    };
    let resp: ChatResponse = post_json(&self.http, &self.url, &self.api_key, &body).await?;
    resp
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| ProviderError::Malformed("completion has no content".into()))
  }

  /// Complete and parse in one retried step, so unparseable output is
  /// requested again.
  async fn ask<T>(
    &self,
    operation: &str,
    instruction: &str,
    text: &str,
    parse: fn(&str) -> Result<T, ProviderError>,
  ) -> Result<T, ProviderError> {
    let user = format!("{instruction}\n\nTEXT:\n{text}");
    let user = user.as_str();
    retry(&self.retry, operation, |_| true, move |_| async move {
      parse(&self.complete(user).await?)
    })
    .await
  }
}

impl LanguageModel for OpenAiChat {
  async fn extract_claims(&self, text: &str) -> Result<Vec<NewClaim>, ProviderError> {
    self.ask("extract_claims", EXTRACT_PROMPT, text, parse_claims).await
  }

  async fn classify_relationship(
    &self,
    claim_a: &str,
    claim_b: &str,
  ) -> Result<Relationship, ProviderError> {
    let pair = format!("CLAIM A: {claim_a}\nCLAIM B: {claim_b}");
    self
      .ask("classify_relationship", RELATIONSHIP_PROMPT, &pair, parse_relationship)
      .await
  }
}

// ─── Response parsing ────────────────────────────────────────────────────────

fn parse_value(content: &str) -> Result<Value, ProviderError> {
  let trimmed = content
    .trim()
    .trim_start_matches("```json")
    .trim_start_matches("```")
    .trim_end_matches("```")
    .trim();
  serde_json::from_str(trimmed)
    .map_err(|e| ProviderError::Malformed(format!("invalid JSON ({e}): {content}")))
}

/// Accepts a bare array or an object with a `claims` array.
pub fn parse_claims(content: &str) -> Result<Vec<NewClaim>, ProviderError> {
  let items = match parse_value(content)? {
    Value::Array(items) => Value::Array(items),
    Value::Object(mut map) => map
      .remove("claims")
      .ok_or_else(|| ProviderError::Malformed("object without `claims`".into()))?,
    other => {
      return Err(ProviderError::Malformed(format!(
        "expected claims array, got {other}"
      )));
    }
  };
  serde_json::from_value(items).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Requires an object with a string `relationship`. Unknown labels map to
/// [`Relationship::Unrelated`].
pub fn parse_relationship(content: &str) -> Result<Relationship, ProviderError> {
  let value = parse_value(content)?;
  value
    .get("relationship")
    .and_then(Value::as_str)
    .map(Relationship::from_label)
    .ok_or_else(|| ProviderError::Malformed(format!("missing `relationship`: {value}")))
}

#[cfg(test)]
mod tests {
  use verity_core::article::{ClaimType, Sentiment};

  use super::*;

  #[test]
  fn claims_parse_from_bare_array_or_object() {
    let bare = r#"[{"claim_text":"Rates rose","claim_type":"fact","sentiment":"negative"}]"#;
    let claims = parse_claims(bare).unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].claim_type, ClaimType::Fact);
    assert_eq!(claims[0].sentiment, Sentiment::Negative);

    let wrapped = format!("{{\"claims\": {bare}}}");
    assert_eq!(parse_claims(&wrapped).unwrap(), claims);
  }

  #[test]
  fn fenced_json_is_accepted() {
    let fenced = "```json\n[]\n```";
    assert!(parse_claims(fenced).unwrap().is_empty());
  }

  #[test]
  fn invalid_claims_are_malformed() {
    assert!(matches!(parse_claims("not json"), Err(ProviderError::Malformed(_))));
    assert!(matches!(parse_claims("42"), Err(ProviderError::Malformed(_))));
    let bad_label = r#"[{"claim_text":"x","claim_type":"rumour","sentiment":"neutral"}]"#;
    assert!(matches!(parse_claims(bad_label), Err(ProviderError::Malformed(_))));
  }

  #[test]
  fn relationship_labels_parse() {
    assert_eq!(
      parse_relationship(r#"{"relationship":"contradicting"}"#).unwrap(),
      Relationship::Contradicting
    );
    assert_eq!(
      parse_relationship(r#"{"relationship":"sort of"}"#).unwrap(),
      Relationship::Unrelated
    );
    assert!(matches!(
      parse_relationship(r#"{"verdict":"supporting"}"#),
      Err(ProviderError::Malformed(_))
    ));
    assert!(matches!(parse_relationship("{"), Err(ProviderError::Malformed(_))));
  }

  #[test]
  fn embeddings_are_reordered_and_normalised() {
    let resp = EmbeddingResponse {
      data: vec![
        EmbeddingData { index: 1, embedding: vec![0.0, 2.0] },
        EmbeddingData { index: 0, embedding: vec![3.0, 4.0] },
      ],
    };
    let vectors = into_vectors(resp, 2).unwrap();
    assert_eq!(vectors[0], vec![0.6, 0.8]);
    assert_eq!(vectors[1], vec![0.0, 1.0]);
  }

  #[test]
  fn embedding_count_mismatch_is_malformed() {
    let resp = EmbeddingResponse { data: vec![] };
    assert!(matches!(into_vectors(resp, 1), Err(ProviderError::Malformed(_))));
  }
}

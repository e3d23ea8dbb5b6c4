//! Engine settings, deserialised from a TOML file layered with `VERITY__*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result, retry::RetryPolicy};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Top-level configuration for `verityd`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path:     PathBuf,
  /// Seconds between scheduled pipeline runs.
  #[serde(default = "default_interval_secs")]
  pub interval_secs:  u64,
  pub embedding:      EmbeddingSettings,
  pub llm:            LlmSettings,
  #[serde(default)]
  pub thresholds:     Thresholds,
  #[serde(default = "RetryPolicy::provider_default")]
  pub provider_retry: RetryPolicy,
  #[serde(default = "RetryPolicy::unit_default")]
  pub unit_retry:     RetryPolicy,
  #[serde(default)]
  pub sources:        Vec<SourceSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  #[serde(default)]
  pub api_key:      String,
  #[serde(default = "default_embedding_model")]
  pub model:        String,
  #[serde(default = "default_dimensions")]
  pub dimensions:   usize,
  #[serde(default = "default_embedding_timeout")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  #[serde(default)]
  pub api_key:      String,
  #[serde(default = "default_llm_model")]
  pub model:        String,
  #[serde(default = "default_temperature")]
  pub temperature:  f32,
  #[serde(default = "default_llm_timeout")]
  pub timeout_secs: u64,
}

/// Cosine-similarity cut-offs, each inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
  /// Minimum similarity for an article to join an existing cluster.
  pub topic:      f32,
  /// Minimum similarity for two claims to share a group.
  pub grouping:   f32,
  /// Minimum similarity before a claim pair is sent to the model in
  /// pairwise comparison.
  pub comparison: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      topic:      0.7,
      grouping:   0.7,
      comparison: 0.75,
    }
  }
}

/// A configured news source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
  pub name:        String,
  #[serde(default)]
  pub country:     Option<String>,
  /// JSON feed polled by the HTTP article feed. Sources without one are
  /// only used for credibility weights.
  #[serde(default)]
  pub feed_url:    Option<String>,
  /// Trust weight in `[0, 1]`; 0.5 when omitted.
  #[serde(default)]
  pub credibility: Option<f64>,
}

fn default_store_path() -> PathBuf { PathBuf::from("verity.db") }
fn default_interval_secs() -> u64 { 120 }
fn default_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_embedding_model() -> String { "text-embedding-3-small".into() }
fn default_dimensions() -> usize { 1536 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_llm_model() -> String { "gpt-4o-mini".into() }
fn default_temperature() -> f32 { 0.1 }
fn default_llm_timeout() -> u64 { 60 }

// ─── Loading ─────────────────────────────────────────────────────────────────

impl Settings {
  /// Read `path` (optional) and `VERITY__*` overrides, then validate.
  ///
  /// Empty API keys fall back to `OPENAI_API_KEY`.
  pub fn load(path: &Path) -> Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("VERITY").separator("__"))
      .build()
      .map_err(|e| Error::Config(e.to_string()))?;

    let mut settings: Self = raw
      .try_deserialize()
      .map_err(|e| Error::Config(e.to_string()))?;

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
      if settings.embedding.api_key.is_empty() {
        settings.embedding.api_key = key.clone();
      }
      if settings.llm.api_key.is_empty() {
        settings.llm.api_key = key;
      }
    }

    settings.validate()?;
    Ok(settings)
  }

  pub fn validate(&self) -> Result<()> {
    let t = &self.thresholds;
    for (name, value) in [
      ("topic", t.topic),
      ("grouping", t.grouping),
      ("comparison", t.comparison),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
          "thresholds.{name} must be within [0, 1], got {value}"
        )));
      }
    }
    if self.embedding.dimensions == 0 {
      return Err(Error::Config("embedding.dimensions must be positive".into()));
    }
    if self.interval_secs == 0 {
      return Err(Error::Config("interval_secs must be positive".into()));
    }
    for source in &self.sources {
      if let Some(weight) = source.credibility
        && !(0.0..=1.0).contains(&weight)
      {
        return Err(Error::Config(format!(
          "credibility of source {:?} must be within [0, 1], got {weight}",
          source.name
        )));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> Settings {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_fill_missing_fields() {
    let s = parse("[embedding]\napi_key = \"k\"\n[llm]\n");
    assert_eq!(s.interval_secs, 120);
    assert_eq!(s.embedding.dimensions, 1536);
    assert_eq!(s.llm.model, "gpt-4o-mini");
    assert_eq!(s.thresholds, Thresholds::default());
    assert_eq!(s.provider_retry.max_attempts, 3);
    assert_eq!(s.unit_retry.initial_delay_ms, 1000);
    assert!(s.sources.is_empty());
    s.validate().unwrap();
  }

  #[test]
  fn sources_are_read_as_an_array_of_tables() {
    let s = parse(
      r#"
      [embedding]
      [llm]
      [[sources]]
      name = "Reuters"
      credibility = 0.9
      feed_url = "https://feeds.example/reuters.json"

      [[sources]]
      name = "Blog"
      "#,
    );
    assert_eq!(s.sources.len(), 2);
    assert_eq!(s.sources[0].credibility, Some(0.9));
    assert!(s.sources[1].feed_url.is_none());
  }

  #[test]
  fn out_of_range_threshold_is_rejected() {
    let mut s = parse("[embedding]\n[llm]\n");
    s.thresholds.topic = 1.5;
    assert!(matches!(s.validate(), Err(Error::Config(_))));
  }

  #[test]
  fn zero_dimensions_is_rejected() {
    let mut s = parse("[embedding]\n[llm]\n");
    s.embedding.dimensions = 0;
    assert!(matches!(s.validate(), Err(Error::Config(_))));
  }
}

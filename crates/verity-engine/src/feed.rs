//! Article sources polled at the start of every pipeline run.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use verity_core::article::NewArticle;

use crate::{Error, Result, config::SourceSettings};

/// Supplies freshly scraped articles. Implementations decide how partial
/// failures are handled; an `Err` means nothing could be fetched.
pub trait ArticleFeed: Send + Sync {
  fn fetch(&self) -> impl Future<Output = Result<Vec<NewArticle>>> + Send + '_;
}

/// One entry of a source's JSON feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedItem {
  pub url:          String,
  #[serde(default)]
  pub title:        Option<String>,
  #[serde(default)]
  pub content:      Option<String>,
  #[serde(default)]
  pub publish_date: Option<DateTime<Utc>>,
}

impl FeedItem {
  /// Attach source metadata. Items without any text are dropped.
  pub fn into_article(self, source: &SourceSettings) -> Option<NewArticle> {
    let content = self.content.unwrap_or_default();
    let title = self.title.unwrap_or_default();
    if content.trim().is_empty() && title.trim().is_empty() {
      return None;
    }
    Some(NewArticle {
      title: if title.trim().is_empty() { self.url.clone() } else { title },
      url: self.url,
      content,
      publish_date: self.publish_date,
      source: source.name.clone(),
      country: source.country.clone(),
    })
  }
}

// ─── HTTP feed ───────────────────────────────────────────────────────────────

/// GETs a JSON array of [`FeedItem`]s from each source with a `feed_url`.
pub struct HttpFeed {
  http:    Client,
  sources: Vec<SourceSettings>,
}

impl HttpFeed {
  pub fn new(sources: Vec<SourceSettings>, timeout: Duration) -> Result<Self> {
    let http = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { http, sources })
  }

  async fn fetch_source(&self, url: &str) -> Result<Vec<FeedItem>, reqwest::Error> {
    self
      .http
      .get(url)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await
  }
}

impl ArticleFeed for HttpFeed {
  async fn fetch(&self) -> Result<Vec<NewArticle>> {
    let mut articles = Vec::new();
    for source in &self.sources {
      let Some(url) = source.feed_url.as_deref() else { continue };
      match self.fetch_source(url).await {
        Ok(items) => {
          let before = articles.len();
          articles.extend(items.into_iter().filter_map(|i| i.into_article(source)));
          tracing::debug!(
            source = %source.name,
            count = articles.len() - before,
            "fetched source"
          );
        }
        Err(e) => {
          tracing::warn!(source = %source.name, error = %e, "source fetch failed, skipping");
        }
      }
    }
    Ok(articles)
  }
}

//! Periodic pipeline runs.

use std::{future::Future, time::Duration};

use tokio::time::MissedTickBehavior;
use verity_core::{
  provider::{EmbeddingProvider, LanguageModel},
  store::ArticleStore,
};

use crate::{Result, feed::ArticleFeed, pipeline::Pipeline};

/// Run the pipeline every `every`, starting immediately, until `shutdown`
/// resolves. Runs never overlap; ticks missed during a long run are skipped.
/// Returns the number of runs started.
pub async fn run_periodic<S, E, L, F>(
  pipeline: &mut Pipeline<S, E, L, F>,
  every: Duration,
  shutdown: impl Future<Output = ()>,
) -> Result<u64>
where
  S: ArticleStore,
  E: EmbeddingProvider,
  L: LanguageModel,
  F: ArticleFeed,
{
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
  tokio::pin!(shutdown);

  let mut runs = 0;
  loop {
    tokio::select! {
      _ = &mut shutdown => {
        tracing::info!(runs, "scheduler stopping");
        return Ok(runs);
      }
      _ = ticker.tick() => {}
    }

    runs += 1;
    match pipeline.run_once().await {
      Ok(_) => {}
      Err(e) if e.is_fatal() => return Err(e),
      Err(e) => tracing::error!(error = %e, "pipeline run failed"),
    }
  }
}

//! `verityd`: the Verity pipeline daemon.
//!
//! Reads `verity.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs the pipeline on a fixed interval. `--once` performs a
//! single run; `evaluate` and `compare` inspect one cluster.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use verity_engine::{
  Pipeline,
  PipelineConfig,
  config::Settings,
  credibility::SourceTrust,
  feed::HttpFeed,
  openai::{OpenAiChat, OpenAiEmbedder},
  scheduler::run_periodic,
};
use verity_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Verity claim clustering and truth scoring")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "verity.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run the pipeline on the configured interval (the default).
  Run {
    /// Perform a single run and exit.
    #[arg(long)]
    once: bool,
  },
  /// Re-evaluate one cluster and print its verdict.
  Evaluate { cluster_id: Uuid },
  /// Print pairwise claim relationships within one cluster.
  Compare { cluster_id: Uuid },
}

type DaemonPipeline = Pipeline<SqliteStore, OpenAiEmbedder, OpenAiChat, HttpFeed>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {:?}", cli.config))?;
  let mut pipeline = build_pipeline(&settings).await?;

  match cli.command.unwrap_or(Command::Run { once: false }) {
    Command::Run { once: true } => {
      let report = pipeline.run_once().await.context("pipeline run failed")?;
      tracing::info!(?report, "single run finished");
    }
    Command::Run { once: false } => {
      let every = Duration::from_secs(settings.interval_secs);
      tracing::info!(interval_secs = settings.interval_secs, "scheduler started");
      run_periodic(&mut pipeline, every, shutdown_signal())
        .await
        .context("scheduler aborted")?;
    }
    Command::Evaluate { cluster_id } => {
      let outcome = pipeline
        .evaluate_cluster(cluster_id)
        .await
        .with_context(|| format!("failed to evaluate cluster {cluster_id}"))?;
      match outcome.verdict {
        Some(v) => println!("{:.3}\t{}", v.confidence_score, v.final_truth_summary),
        None => println!("cluster {cluster_id} has fewer than two claims"),
      }
    }
    Command::Compare { cluster_id } => {
      let pairs = pipeline
        .compare_cluster(cluster_id)
        .await
        .with_context(|| format!("failed to compare claims of cluster {cluster_id}"))?;
      for (claim_id, relationship) in pairs {
        println!("{claim_id}\t{relationship:?}");
      }
    }
  }

  Ok(())
}

async fn build_pipeline(settings: &Settings) -> anyhow::Result<DaemonPipeline> {
  let store_path = expand_tilde(&settings.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let embedder = OpenAiEmbedder::new(&settings.embedding, settings.provider_retry)?;
  let llm = OpenAiChat::new(&settings.llm, settings.provider_retry)?;
  let feed = HttpFeed::new(
    settings.sources.clone(),
    Duration::from_secs(settings.embedding.timeout_secs),
  )?;

  Pipeline::new(
    store,
    embedder,
    llm,
    feed,
    SourceTrust::from_sources(&settings.sources),
    PipelineConfig::from_settings(settings),
  )
  .await
  .context("failed to initialise pipeline")
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

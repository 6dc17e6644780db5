//! repopulse-backfill - reconstruct historical repository metrics
//!
//! Walks the cached repository list, fetches each repository's commit
//! history for the lookback window, and writes the historical-metrics
//! and display-ready metrics artifacts. Checkpoints after every
//! repository, so an interrupted run resumes where it left off.
//!
//! Requires a GitHub token (`GITHUB_TOKEN` or `github.token` in
//! `~/.config/repopulse/config.toml`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use repopulse_core::{BackfillRunner, BackfillSummary, Config, GithubClient, MetricsStore};

#[derive(Parser)]
#[command(name = "repopulse-backfill")]
#[command(about = "Backfill historical GitHub repository metrics")]
#[command(version)]
struct Args {
    /// GitHub account to measure (overrides the config file)
    #[arg(long)]
    owner: Option<String>,

    /// Data directory for input and output artifacts
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Lookback window in calendar months
    #[arg(long)]
    lookback_months: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration and apply CLI overrides
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(owner) = args.owner {
        config.github.owner = owner;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(months) = args.lookback_months {
        config.backfill.lookback_months = months;
    }

    // Initialize logging (to file, keeping stdout for the progress bar)
    let _log_guard =
        repopulse_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("repopulse-backfill starting");

    // Fatal preconditions: token and repository list
    let token = config
        .github
        .resolve_token()
        .context("a GitHub token is required for the backfill")?;
    let client =
        GithubClient::new(&config.github, &token).context("failed to create GitHub client")?;
    let store = MetricsStore::new(&config.storage.data_dir);

    println!(
        "Backfilling {} months of history for {}",
        config.backfill.lookback_months, config.github.owner
    );
    println!("Data directory: {}", store.data_dir().display());

    let runner = BackfillRunner::new(client, store.clone(), &config.backfill);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let summary = runner
        .run_with_progress(|current, total, name| {
            if current == 0 {
                pb.set_length(total as u64);
            }
            pb.set_position(current as u64);
            pb.set_message(name.to_string());
        })
        .await
        .context("backfill failed")?;

    pb.finish_and_clear();

    print_summary(&summary, &store);

    tracing::info!(
        processed = summary.repos_processed,
        from_cache = summary.repos_from_cache,
        failed = summary.repos_failed,
        "repopulse-backfill complete"
    );

    Ok(())
}

/// Print the run summary
fn print_summary(summary: &BackfillSummary, store: &MetricsStore) {
    println!("\nBackfill complete:");
    println!("  Repositories processed: {}", summary.repos_processed);
    println!("  Reused from cache:      {}", summary.repos_from_cache);
    println!("  Failed:                 {}", summary.repos_failed);
    println!("  Commits observed:       {}", summary.total_commits);
    println!("  Snapshots written:      {}", summary.snapshots_written);

    if !summary.errors.is_empty() {
        println!("\nErrors ({}):", summary.errors.len());
        for (repo, err) in &summary.errors {
            println!("  {}: {}", repo, err);
        }
    }

    println!("\nArtifacts:");
    println!("  {}", store.historical_path().display());
    println!("  {}", store.metrics_path().display());
    println!(
        "\nOnce the data looks right you can delete the backfill cache:\n  rm -rf {}\n  rm {}",
        store.cache_dir().display(),
        store.progress_path().display()
    );
}

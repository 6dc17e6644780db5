//! repopulse-snapshot - record today's repository metrics
//!
//! Gathers each repository's current commit count, stars, and LOC
//! estimate, records one dated snapshot in the historical store, and
//! regenerates the display-ready monthly projection. Run daily to
//! accumulate real history going forward.
//!
//! `--demo` generates randomized stub data without touching the network,
//! for previewing the site without a token.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use repopulse_core::{Config, GithubClient, MetricsStore, SnapshotRunner, SnapshotSummary};

#[derive(Parser)]
#[command(name = "repopulse-snapshot")]
#[command(about = "Record a dated snapshot of current repository metrics")]
#[command(version)]
struct Args {
    /// GitHub account to measure (overrides the config file)
    #[arg(long)]
    owner: Option<String>,

    /// Data directory for input and output artifacts
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Generate randomized stub data instead of calling the API
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(owner) = args.owner {
        config.github.owner = owner;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }

    let _log_guard =
        repopulse_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(demo = args.demo, "repopulse-snapshot starting");

    let store = MetricsStore::new(&config.storage.data_dir);

    let runner = if args.demo {
        println!("Demo mode: generating stub metrics (no API calls)");
        SnapshotRunner::demo(store.clone())
    } else {
        let token = config
            .github
            .resolve_token()
            .context("a GitHub token is required (or pass --demo for stub data)")?;
        let client =
            GithubClient::new(&config.github, &token).context("failed to create GitHub client")?;
        SnapshotRunner::new(client, store.clone())
    };

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
        .context("snapshot failed")?;

    pb.finish_and_clear();

    print_summary(&summary, &store);

    tracing::info!(
        repos = summary.repos,
        date = %summary.snapshot_date,
        "repopulse-snapshot complete"
    );

    Ok(())
}

/// Print the run summary
fn print_summary(summary: &SnapshotSummary, store: &MetricsStore) {
    let action = if summary.replaced_existing {
        "Updated"
    } else {
        "Recorded"
    };
    println!("\n{} snapshot for {}:", action, summary.snapshot_date);
    println!("  Repositories:        {}", summary.repos);
    println!("  Total commits:       {}", summary.total_commits);
    println!("  Total stars:         {}", summary.total_stars);
    println!("  Total lines of code: {}", summary.total_lines_of_code);
    println!("  Chart data points:   {}", summary.metrics_points);

    println!("\nArtifacts:");
    println!("  {}", store.historical_path().display());
    println!("  {}", store.metrics_path().display());

    if summary.metrics_points < 12 {
        println!(
            "\nNote: {} month(s) of data so far; run daily to accumulate more.",
            summary.metrics_points
        );
    }
}

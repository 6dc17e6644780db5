//! # repopulse-core
//!
//! Core library for repopulse - GitHub repository metrics collection for
//! a portfolio site.
//!
//! This library provides:
//! - An authenticated GitHub REST API client with rate-limit-polite
//!   sequential pagination
//! - Month-bucketed commit aggregation and cross-repository snapshot
//!   merging with forward-fill
//! - Resumable backfill orchestration with per-repository checkpoints
//! - A daily snapshot runner that accumulates real history going forward
//!
//! ## Architecture
//!
//! Everything is a linear batch pipeline over JSON artifacts:
//! - **Input:** `cached-repos.json`, the repository list produced by a
//!   separate caching step
//! - **Checkpoints:** `backfill-cache/<repo>.json` and
//!   `backfill-progress.json`, enabling safe interruption and resume
//! - **Output:** `historical-metrics.json` (full snapshot store) and
//!   `repos-metrics.json` (the display-ready projection)
//!
//! ## Example
//!
//! ```rust,no_run
//! use repopulse_core::{BackfillRunner, Config, GithubClient, MetricsStore};
//!
//! # async fn run() -> repopulse_core::Result<()> {
//! let config = Config::load()?;
//! let token = config.github.resolve_token()?;
//! let client = GithubClient::new(&config.github, &token)?;
//! let store = MetricsStore::new(&config.storage.data_dir);
//!
//! let runner = BackfillRunner::new(client, store, &config.backfill);
//! let summary = runner.run().await?;
//! println!("Backfilled {} repositories", summary.repos_processed);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use backfill::{BackfillRunner, BackfillSummary};
pub use config::Config;
pub use error::{Error, Result};
pub use github::GithubClient;
pub use snapshot::{SnapshotRunner, SnapshotSummary};
pub use store::MetricsStore;
pub use types::*;

// Public modules
pub mod aggregate;
pub mod backfill;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod snapshot;
pub mod store;
pub mod types;

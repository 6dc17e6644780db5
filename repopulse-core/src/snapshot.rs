//! Current-metrics snapshot runner
//!
//! The daily companion to the backfill: gathers each repository's
//! current commit count, stars, and LOC estimate, records one dated
//! snapshot in the historical store (replacing any snapshot already
//! recorded for the same date), and regenerates the display-ready
//! monthly projection. Run daily, it accumulates real history going
//! forward while the backfill reconstructs the past.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;

use crate::aggregate::monthly_metrics;
use crate::error::Result;
use crate::github::GithubClient;
use crate::store::MetricsStore;
use crate::types::{
    DailyMetrics, HistoricalStorage, MetricsData, RepoDescriptor, RepoMetricsEntry,
    RepoMetricsSnapshot,
};

/// Politeness delay between repositories in live mode.
const REPO_DELAY: Duration = Duration::from_millis(100);

/// Where snapshot metrics come from.
pub enum MetricsSource {
    /// Real data from the GitHub API
    Live(GithubClient),
    /// Randomized stub data; a degraded demo mode for running without a
    /// token, never used by the backfill path
    Demo,
}

/// Result of a snapshot run.
#[derive(Debug, Default)]
pub struct SnapshotSummary {
    /// Repositories measured
    pub repos: usize,
    /// Sum of commit counts
    pub total_commits: u64,
    /// Sum of star counts
    pub total_stars: u64,
    /// Sum of LOC estimates
    pub total_lines_of_code: u64,
    /// The snapshot date recorded (`YYYY-MM-DD`)
    pub snapshot_date: String,
    /// Whether an existing same-date snapshot was replaced
    pub replaced_existing: bool,
    /// Data points in the regenerated monthly projection
    pub metrics_points: usize,
}

/// Gathers one dated cross-repository snapshot and updates the artifacts.
pub struct SnapshotRunner {
    source: MetricsSource,
    store: MetricsStore,
}

impl SnapshotRunner {
    /// Snapshot real metrics through an API client.
    pub fn new(client: GithubClient, store: MetricsStore) -> Self {
        Self {
            source: MetricsSource::Live(client),
            store,
        }
    }

    /// Snapshot randomized stub metrics (no network access).
    pub fn demo(store: MetricsStore) -> Self {
        Self {
            source: MetricsSource::Demo,
            store,
        }
    }

    /// Run the snapshot.
    pub async fn run(&self) -> Result<SnapshotSummary> {
        self.run_with_progress(|_, _, _| {}).await
    }

    /// Run the snapshot with a progress callback, called with
    /// `(current_repo_index, total_repos, repo_name)` per repository.
    pub async fn run_with_progress<F>(&self, mut on_progress: F) -> Result<SnapshotSummary>
    where
        F: FnMut(usize, usize, &str),
    {
        let repo_list = self.store.load_repo_list()?;
        let repos = repo_list.repositories;
        let total = repos.len();

        let mut entries = Vec::with_capacity(total);
        for (i, repo) in repos.iter().enumerate() {
            on_progress(i, total, &repo.name);

            let entry = match &self.source {
                MetricsSource::Live(client) => {
                    let result = self.measure_repository(client, repo).await;
                    if i + 1 < total {
                        tokio::time::sleep(REPO_DELAY).await;
                    }
                    result
                }
                MetricsSource::Demo => stub_entry(repo),
            };

            tracing::info!(
                repo = %entry.name,
                commits = entry.commits,
                stars = entry.stars,
                loc = entry.loc,
                "Measured repository"
            );
            entries.push(entry);
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let aggregated = DailyMetrics {
            date: today.clone(),
            total_commits: entries.iter().map(|e| e.commits).sum(),
            total_stars: entries.iter().map(|e| e.stars).sum(),
            total_lines_of_code: entries.iter().map(|e| e.loc).sum(),
        };

        let mut summary = SnapshotSummary {
            repos: total,
            total_commits: aggregated.total_commits,
            total_stars: aggregated.total_stars,
            total_lines_of_code: aggregated.total_lines_of_code,
            snapshot_date: today.clone(),
            ..Default::default()
        };

        let snapshot = RepoMetricsSnapshot {
            date: today.clone(),
            repos: entries,
            aggregated,
        };

        // Upsert today's snapshot into the historical store
        let mut historical = self
            .store
            .load_historical()?
            .unwrap_or_else(HistoricalStorage::empty);
        if let Some(existing) = historical.snapshots.iter_mut().find(|s| s.date == today) {
            *existing = snapshot;
            summary.replaced_existing = true;
        } else {
            historical.snapshots.push(snapshot);
        }
        historical.snapshots.sort_by(|a, b| a.date.cmp(&b.date));
        historical.last_updated = Utc::now();
        self.store.save_historical(&historical)?;

        // Regenerate the monthly projection for the chart
        let metrics = monthly_metrics(&historical.snapshots);
        summary.metrics_points = metrics.len();
        self.store.save_metrics(&MetricsData {
            generated_at: Utc::now(),
            metrics,
        })?;

        tracing::info!(
            repos = summary.repos,
            total_commits = summary.total_commits,
            snapshots = historical.snapshots.len(),
            metrics_points = summary.metrics_points,
            "Snapshot complete"
        );

        Ok(summary)
    }

    /// Measure one repository, degrading each metric to 0 on failure.
    async fn measure_repository(
        &self,
        client: &GithubClient,
        repo: &RepoDescriptor,
    ) -> RepoMetricsEntry {
        let commits = match client.commit_count(&repo.name, None).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(repo = %repo.name, error = %e, "Commit count failed, recording 0");
                0
            }
        };
        let loc = match client.estimate_lines_of_code(&repo.name).await {
            Ok(loc) => loc,
            Err(e) => {
                tracing::warn!(repo = %repo.name, error = %e, "LOC estimate failed, recording 0");
                0
            }
        };

        RepoMetricsEntry {
            name: repo.name.clone(),
            // Stars come from the cached descriptor; the list was
            // refreshed by the caching step that produced it.
            stars: repo.stargazers_count,
            commits,
            loc,
        }
    }
}

/// Randomized stub metrics for demo mode.
fn stub_entry(repo: &RepoDescriptor) -> RepoMetricsEntry {
    let mut rng = rand::thread_rng();
    RepoMetricsEntry {
        name: repo.name.clone(),
        stars: repo.stargazers_count,
        commits: rng.gen_range(50..550),
        loc: rng.gen_range(5_000..55_000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CachedRepoList;
    use tempfile::TempDir;

    fn seeded_store(dir: &TempDir, names: &[&str]) -> MetricsStore {
        let store = MetricsStore::new(dir.path());
        let list = CachedRepoList {
            repositories: names
                .iter()
                .map(|name| RepoDescriptor {
                    name: name.to_string(),
                    stargazers_count: 2,
                })
                .collect(),
        };
        std::fs::create_dir_all(store.data_dir()).unwrap();
        std::fs::write(
            store.repo_list_path(),
            serde_json::to_string_pretty(&list).unwrap(),
        )
        .unwrap();
        store
    }

    #[tokio::test]
    async fn test_demo_snapshot_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, &["alpha", "beta"]);

        let runner = SnapshotRunner::demo(store.clone());
        let summary = runner.run().await.unwrap();

        assert_eq!(summary.repos, 2);
        assert_eq!(summary.total_stars, 4);
        assert!(!summary.replaced_existing);

        let historical = store.load_historical().unwrap().unwrap();
        assert_eq!(historical.snapshots.len(), 1);
        assert_eq!(historical.snapshots[0].date, summary.snapshot_date);
        assert_eq!(historical.snapshots[0].repos.len(), 2);

        assert!(store.metrics_path().exists());
        assert_eq!(summary.metrics_points, 1);
    }

    #[tokio::test]
    async fn test_same_day_snapshot_is_replaced() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, &["alpha"]);

        let runner = SnapshotRunner::demo(store.clone());
        runner.run().await.unwrap();
        let summary = runner.run().await.unwrap();

        assert!(summary.replaced_existing);
        let historical = store.load_historical().unwrap().unwrap();
        assert_eq!(historical.snapshots.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshots_stay_sorted_by_date() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, &["alpha"]);

        // Pre-seed an older and a far-future snapshot
        let make = |date: &str| RepoMetricsSnapshot {
            date: date.to_string(),
            repos: vec![],
            aggregated: DailyMetrics {
                date: date.to_string(),
                total_commits: 0,
                total_stars: 0,
                total_lines_of_code: 0,
            },
        };
        store
            .save_historical(&HistoricalStorage {
                snapshots: vec![make("2020-01-31"), make("2099-12-31")],
                last_updated: Utc::now(),
            })
            .unwrap();

        let runner = SnapshotRunner::demo(store.clone());
        runner.run().await.unwrap();

        let historical = store.load_historical().unwrap().unwrap();
        assert_eq!(historical.snapshots.len(), 3);
        for pair in historical.snapshots.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }
}

//! Domain types for repository metrics collection
//!
//! These types map 1:1 onto the JSON artifacts the tools read and write.
//! Serialized field names are part of the on-disk format consumed by the
//! portfolio frontend, so the serde renames here are load-bearing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single commit observed on a repository's default branch.
///
/// Ephemeral: produced by the API client, consumed by the monthly
/// bucketing pass, never persisted.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    /// Commit author date
    pub date: DateTime<Utc>,
    /// Commit SHA
    pub sha: String,
}

/// One month of a repository's history.
///
/// `commits` is the running total of all commits up to and including
/// `month`, so it is non-decreasing across a repository's own series.
/// `stars` and `loc` are current-point-in-time values repeated across all
/// months: GitHub exposes no historical star or language data, and the
/// approximation is deliberate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMonthlySnapshot {
    /// Calendar month key, `YYYY-MM`
    pub month: String,
    /// Cumulative commit count up to and including this month
    pub commits: u64,
    /// Current star count (not historical)
    pub stars: u64,
    /// Current lines-of-code estimate (not historical)
    pub loc: u64,
}

/// Per-repository backfill checkpoint, persisted to the cache directory.
///
/// `completed` flips to true only after every fetch/aggregate step for the
/// repository succeeded; a record left incomplete by a crash is simply
/// recomputed on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoProgress {
    /// Repository name
    pub name: String,
    /// Whether all steps for this repository finished
    pub completed: bool,
    /// Total commits observed in the lookback window
    pub total_commits: u64,
    /// Cumulative monthly series, ascending by month
    pub monthly_snapshots: Vec<RepoMonthlySnapshot>,
}

/// Run-level backfill checkpoint, persisted after every repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillProgress {
    /// When this run (or the run being resumed) started
    pub started_at: DateTime<Utc>,
    /// Last time the checkpoint was written
    pub last_updated: DateTime<Utc>,
    /// Number of repositories in the input list
    pub total_repos: usize,
    /// Number of repositories with a completed cache record
    pub completed_repos: usize,
    /// Per-repository records collected so far
    #[serde(default)]
    pub repo_progress: Vec<RepoProgress>,
}

impl BackfillProgress {
    /// Create a fresh checkpoint for a run over `total_repos` repositories.
    pub fn new(total_repos: usize) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            last_updated: now,
            total_repos,
            completed_repos: 0,
            repo_progress: Vec::new(),
        }
    }
}

/// One repository's contribution to a cross-repository snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetricsEntry {
    /// Repository name
    pub name: String,
    /// Star count
    pub stars: u64,
    /// Cumulative commit count
    pub commits: u64,
    /// Lines-of-code estimate
    pub loc: u64,
}

/// Totals across every repository contributing to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetrics {
    /// Snapshot date, `YYYY-MM-DD`
    pub date: String,
    /// Sum of cumulative commit counts
    pub total_commits: u64,
    /// Sum of star counts
    pub total_stars: u64,
    /// Sum of lines-of-code estimates
    pub total_lines_of_code: u64,
}

/// Cross-repository snapshot for one date (last day of a month for
/// backfilled data, "today" for the snapshot tool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetricsSnapshot {
    /// Snapshot date, `YYYY-MM-DD`
    pub date: String,
    /// Per-repository values contributing to this snapshot
    pub repos: Vec<RepoMetricsEntry>,
    /// Totals across `repos`
    pub aggregated: DailyMetrics,
}

/// The historical-data artifact: every snapshot ever recorded, ascending
/// by date with no duplicate dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalStorage {
    /// Snapshots, sorted ascending by date
    pub snapshots: Vec<RepoMetricsSnapshot>,
    /// When the artifact was last written
    pub last_updated: DateTime<Utc>,
}

impl HistoricalStorage {
    /// An empty store stamped with the current time.
    pub fn empty() -> Self {
        Self {
            snapshots: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

/// The display-ready artifact consumed by the frontend chart: a projection
/// of `HistoricalStorage` down to the per-snapshot aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsData {
    /// When the projection was generated
    pub generated_at: DateTime<Utc>,
    /// Aggregated metrics, same ascending date order as the source snapshots
    pub metrics: Vec<DailyMetrics>,
}

/// A repository descriptor from the cached repository list.
///
/// The list is produced by a separate caching step against the GitHub
/// repository listing endpoint, so field names follow the API (snake_case).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoDescriptor {
    /// Repository name (without owner)
    pub name: String,
    /// Star count at the time the list was cached
    #[serde(default)]
    pub stargazers_count: u64,
}

/// The cached repository list input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRepoList {
    /// Repositories to process, in processing order
    pub repositories: Vec<RepoDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_progress_serializes_camel_case() {
        let progress = RepoProgress {
            name: "owner/repo".to_string(),
            completed: true,
            total_commits: 42,
            monthly_snapshots: vec![RepoMonthlySnapshot {
                month: "2024-01".to_string(),
                commits: 42,
                stars: 7,
                loc: 1000,
            }],
        };

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["totalCommits"], 42);
        assert!(json["monthlySnapshots"].is_array());
        assert_eq!(json["monthlySnapshots"][0]["month"], "2024-01");
    }

    #[test]
    fn test_daily_metrics_field_names() {
        let metrics = DailyMetrics {
            date: "2024-03-31".to_string(),
            total_commits: 10,
            total_stars: 2,
            total_lines_of_code: 500,
        };

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["totalCommits"], 10);
        assert_eq!(json["totalStars"], 2);
        assert_eq!(json["totalLinesOfCode"], 500);
    }

    #[test]
    fn test_cached_repo_list_tolerates_missing_stars() {
        let json = r#"{"repositories": [{"name": "alpha"}, {"name": "beta", "stargazers_count": 3}]}"#;
        let list: CachedRepoList = serde_json::from_str(json).unwrap();
        assert_eq!(list.repositories.len(), 2);
        assert_eq!(list.repositories[0].stargazers_count, 0);
        assert_eq!(list.repositories[1].stargazers_count, 3);
    }
}

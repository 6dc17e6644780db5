//! On-disk persistence for progress records and output artifacts
//!
//! Everything is a whole-file JSON overwrite performed synchronously
//! between processing steps; execution is single-threaded and
//! single-process, so no locking discipline is needed. Cache records are
//! never deleted here; cleanup after a finished backfill is a manual
//! operator action.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{
    BackfillProgress, CachedRepoList, HistoricalStorage, MetricsData, RepoProgress,
};

/// File names inside the data directory.
const REPO_LIST_FILE: &str = "cached-repos.json";
const PROGRESS_FILE: &str = "backfill-progress.json";
const CACHE_DIR: &str = "backfill-cache";
const HISTORICAL_FILE: &str = "historical-metrics.json";
const METRICS_FILE: &str = "repos-metrics.json";

/// Store for input/output JSON artifacts under one data directory.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    data_dir: PathBuf,
}

impl MetricsStore {
    /// Create a store rooted at `data_dir`. Nothing is created on disk
    /// until the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The data directory this store reads and writes.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the cached repository list input file.
    pub fn repo_list_path(&self) -> PathBuf {
        self.data_dir.join(REPO_LIST_FILE)
    }

    /// Path of the run-level backfill checkpoint.
    pub fn progress_path(&self) -> PathBuf {
        self.data_dir.join(PROGRESS_FILE)
    }

    /// Directory holding per-repository cache records.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join(CACHE_DIR)
    }

    /// Path of the historical snapshot artifact.
    pub fn historical_path(&self) -> PathBuf {
        self.data_dir.join(HISTORICAL_FILE)
    }

    /// Path of the display-ready metrics artifact.
    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir.join(METRICS_FILE)
    }

    /// Cache file path for a repository, with path separators in the
    /// name escaped so every record is a direct child of the cache dir.
    pub fn repo_cache_path(&self, repo_name: &str) -> PathBuf {
        self.cache_dir().join(format!("{}.json", repo_name.replace('/', "_")))
    }

    /// Load the repository list. A missing file is a fatal precondition
    /// for any run.
    pub fn load_repo_list(&self) -> Result<CachedRepoList> {
        let path = self.repo_list_path();
        if !path.exists() {
            return Err(Error::RepoListNotFound(path));
        }
        read_json(&path)
    }

    /// Load a per-repository cache record, if one exists.
    pub fn load_repo_cache(&self, repo_name: &str) -> Result<Option<RepoProgress>> {
        let path = self.repo_cache_path(repo_name);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Persist a per-repository cache record.
    pub fn save_repo_cache(&self, progress: &RepoProgress) -> Result<()> {
        write_json(&self.repo_cache_path(&progress.name), progress)
    }

    /// Load the run-level checkpoint, if a prior run left one behind.
    pub fn load_backfill_progress(&self) -> Result<Option<BackfillProgress>> {
        let path = self.progress_path();
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Persist the run-level checkpoint.
    pub fn save_backfill_progress(&self, progress: &BackfillProgress) -> Result<()> {
        write_json(&self.progress_path(), progress)
    }

    /// Load the historical snapshot store, if present.
    pub fn load_historical(&self) -> Result<Option<HistoricalStorage>> {
        let path = self.historical_path();
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Persist the historical snapshot store.
    pub fn save_historical(&self, storage: &HistoricalStorage) -> Result<()> {
        write_json(&self.historical_path(), storage)
    }

    /// Persist the display-ready metrics projection.
    pub fn save_metrics(&self, metrics: &MetricsData) -> Result<()> {
        write_json(&self.metrics_path(), metrics)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Pretty-printed whole-file overwrite, creating parent directories on
/// demand. Pretty output keeps the artifacts diffable in the site repo.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepoMonthlySnapshot;
    use tempfile::TempDir;

    fn sample_progress(name: &str) -> RepoProgress {
        RepoProgress {
            name: name.to_string(),
            completed: true,
            total_commits: 3,
            monthly_snapshots: vec![RepoMonthlySnapshot {
                month: "2024-01".to_string(),
                commits: 3,
                stars: 2,
                loc: 150,
            }],
        }
    }

    #[test]
    fn test_repo_cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());

        assert!(store.load_repo_cache("alpha").unwrap().is_none());

        let progress = sample_progress("alpha");
        store.save_repo_cache(&progress).unwrap();

        let loaded = store.load_repo_cache("alpha").unwrap().unwrap();
        assert_eq!(loaded, progress);
    }

    #[test]
    fn test_repo_cache_rewrite_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());

        let progress = sample_progress("alpha");
        store.save_repo_cache(&progress).unwrap();
        let first = fs::read(store.repo_cache_path("alpha")).unwrap();

        let reloaded = store.load_repo_cache("alpha").unwrap().unwrap();
        store.save_repo_cache(&reloaded).unwrap();
        let second = fs::read(store.repo_cache_path("alpha")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_repo_cache_path_escapes_separators() {
        let store = MetricsStore::new("data");
        let path = store.repo_cache_path("owner/repo");
        assert!(path.ends_with("backfill-cache/owner_repo.json"));
    }

    #[test]
    fn test_missing_repo_list_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());
        assert!(matches!(
            store.load_repo_list(),
            Err(Error::RepoListNotFound(_))
        ));
    }

    #[test]
    fn test_backfill_progress_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());

        assert!(store.load_backfill_progress().unwrap().is_none());

        let mut progress = BackfillProgress::new(4);
        progress.completed_repos = 2;
        progress.repo_progress.push(sample_progress("alpha"));
        store.save_backfill_progress(&progress).unwrap();

        let loaded = store.load_backfill_progress().unwrap().unwrap();
        assert_eq!(loaded.total_repos, 4);
        assert_eq!(loaded.completed_repos, 2);
        assert_eq!(loaded.repo_progress.len(), 1);
    }

    #[test]
    fn test_historical_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path());

        assert!(store.load_historical().unwrap().is_none());

        let storage = HistoricalStorage::empty();
        store.save_historical(&storage).unwrap();
        let loaded = store.load_historical().unwrap().unwrap();
        assert!(loaded.snapshots.is_empty());
    }
}

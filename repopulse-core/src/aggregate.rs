//! Commit history aggregation
//!
//! Two passes over small in-memory data:
//!
//! 1. Per repository: bucket commit timestamps into calendar months and
//!    turn the buckets into a cumulative monthly series.
//! 2. Across repositories: merge the per-repository series into one
//!    ordered timeline, forward-filling each repository's last known
//!    values into months where it has no new data.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

use crate::types::{
    CommitRecord, DailyMetrics, RepoMetricsEntry, RepoMetricsSnapshot, RepoMonthlySnapshot,
    RepoProgress,
};

/// Calendar month key (`YYYY-MM`) for a commit timestamp.
pub fn month_key(date: &DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Last calendar day of a `YYYY-MM` month key.
///
/// Returns `None` for keys that do not parse as a valid year-month.
pub fn last_day_of_month(month: &str) -> Option<NaiveDate> {
    let (year, month_num) = month.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month_num: u32 = month_num.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month_num, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// Count commits per calendar month.
///
/// Insertion order is irrelevant; the `BTreeMap` hands the months back
/// sorted, which is the order the cumulative pass consumes them in.
pub fn bucket_by_month(records: &[CommitRecord]) -> BTreeMap<String, u64> {
    let mut buckets = BTreeMap::new();
    for record in records {
        *buckets.entry(month_key(&record.date)).or_insert(0) += 1;
    }
    buckets
}

/// Turn monthly commit counts into a cumulative series.
///
/// Every emitted snapshot carries the repository's *current* star and
/// LOC values; no historical data for those exists on the source API.
pub fn to_cumulative_snapshots(
    buckets: &BTreeMap<String, u64>,
    stars: u64,
    loc: u64,
) -> Vec<RepoMonthlySnapshot> {
    let mut cumulative = 0u64;
    buckets
        .iter()
        .map(|(month, count)| {
            cumulative += count;
            RepoMonthlySnapshot {
                month: month.clone(),
                commits: cumulative,
                stars,
                loc,
            }
        })
        .collect()
}

/// Merge per-repository monthly series into one ordered timeline.
///
/// The union of all months drives the output: a repository contributes its
/// most recent snapshot with month <= the current month (forward-fill), and
/// is excluded from months before its first snapshot. Each repository's
/// series must be sorted ascending by month, which holds for everything
/// produced by [`to_cumulative_snapshots`].
///
/// The forward-fill join advances one cursor per repository across the
/// sorted months, keeping the pass linear in repositories x months.
pub fn aggregate_snapshots(all_repo_progress: &[RepoProgress]) -> Vec<RepoMetricsSnapshot> {
    let months: BTreeSet<&str> = all_repo_progress
        .iter()
        .flat_map(|p| p.monthly_snapshots.iter().map(|s| s.month.as_str()))
        .collect();

    // One cursor per repository: index of the first snapshot *after* the
    // current month, advanced monotonically.
    let mut cursors = vec![0usize; all_repo_progress.len()];
    let mut snapshots = Vec::with_capacity(months.len());

    for month in months {
        let date = match last_day_of_month(month) {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => {
                tracing::warn!(month, "Skipping unparseable month key");
                continue;
            }
        };

        let mut repos = Vec::new();
        let mut total_commits = 0u64;
        let mut total_stars = 0u64;
        let mut total_loc = 0u64;

        for (progress, cursor) in all_repo_progress.iter().zip(cursors.iter_mut()) {
            let series = &progress.monthly_snapshots;
            while *cursor < series.len() && series[*cursor].month.as_str() <= month {
                *cursor += 1;
            }
            // cursor now points past the last snapshot <= month; zero
            // means this repository has not started yet.
            if *cursor == 0 {
                continue;
            }
            let snapshot = &series[*cursor - 1];

            total_commits += snapshot.commits;
            total_stars += snapshot.stars;
            total_loc += snapshot.loc;
            repos.push(RepoMetricsEntry {
                name: progress.name.clone(),
                stars: snapshot.stars,
                commits: snapshot.commits,
                loc: snapshot.loc,
            });
        }

        snapshots.push(RepoMetricsSnapshot {
            date: date.clone(),
            repos,
            aggregated: DailyMetrics {
                date,
                total_commits,
                total_stars,
                total_lines_of_code: total_loc,
            },
        });
    }

    snapshots
}

/// Project snapshots down to one aggregate per calendar month.
///
/// Where several snapshots fall in the same month (the snapshot tool
/// records one per day), the last one wins. Input is assumed sorted
/// ascending by date, as the historical store maintains it.
pub fn monthly_metrics(snapshots: &[RepoMetricsSnapshot]) -> Vec<DailyMetrics> {
    let mut by_month: BTreeMap<&str, &DailyMetrics> = BTreeMap::new();
    for snapshot in snapshots {
        // "YYYY-MM-DD" -> "YYYY-MM"
        let month = snapshot.date.get(..7).unwrap_or(&snapshot.date);
        by_month.insert(month, &snapshot.aggregated);
    }
    by_month.into_values().cloned().collect()
}

//! Per-repository latency statistics.
//!
//! Dispersion uses the sample standard deviation (n - 1 denominator). A repository with a
//! single record has no spread to measure, so its standard deviation and standard error are
//! reported as zero instead of NaN.
//!
//! Percentiles interpolate linearly between the two closest ranks of the sorted sample,
//! at position `q * (n - 1)`.

use crate::config::RepoId;
use crate::fetcher::PullRequestRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Latency summary for one repository, in hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositorySummary {
    pub repo: RepoId,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub std_error: f64,
    /// `mean - std_error`
    pub window_left: f64,
    /// `mean + std_error`
    pub window_right: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Groups records by repository and summarizes each group.
///
/// Rows come out in ascending repository order. Repositories without records produce no row.
pub fn summarize(records: &[PullRequestRecord]) -> Vec<RepositorySummary> {
    let mut grouped: BTreeMap<&RepoId, Vec<f64>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(&record.repo)
            .or_default()
            .push(record.elapsed_hours);
    }

    grouped
        .into_iter()
        .filter_map(|(repo, hours)| summarize_hours(repo.clone(), &hours))
        .collect()
}

/// Summarizes one repository's elapsed hours. Returns `None` for an empty sample.
pub fn summarize_hours(repo: RepoId, hours: &[f64]) -> Option<RepositorySummary> {
    if hours.is_empty() {
        return None;
    }

    let count = hours.len();
    let mean = hours.iter().sum::<f64>() / count as f64;
    let std_dev = sample_std_dev(hours, mean);
    let std_error = std_dev / (count as f64).sqrt();

    let mut sorted = hours.to_vec();
    sorted.sort_by(f64::total_cmp);

    Some(RepositorySummary {
        repo,
        count,
        mean,
        std_dev,
        std_error,
        window_left: mean - std_error,
        window_right: mean + std_error,
        p50: quantile(&sorted, 0.50),
        p95: quantile(&sorted, 0.95),
        p99: quantile(&sorted, 0.99),
    })
}

fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

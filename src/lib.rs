pub mod config;
pub mod fetcher;
pub mod github;
pub mod options;
pub mod output;
pub mod stats;

use chrono::{DateTime, Utc};
use config::RepoId;
use fetcher::FetchReport;
use github::PullRequestSource;
use stats::RepositorySummary;

/// Everything one run produces: the filtered records and their per-repository summary.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: FetchReport,
    pub summaries: Vec<RepositorySummary>,
}

/// Fetches, filters and summarizes merge latency for `repos`.
pub async fn analyze<S: PullRequestSource>(
    source: &S,
    repos: &[RepoId],
    last_days: i64,
    now: DateTime<Utc>,
    concurrency: usize,
) -> anyhow::Result<Analysis> {
    let report = fetcher::fetch_records(source, repos, last_days, now, concurrency).await?;
    let summaries = stats::summarize(&report.records);

    tracing::info!(
        repos = repos.len(),
        records = report.records.len(),
        summaries = summaries.len(),
        "Analysis complete"
    );

    Ok(Analysis { report, summaries })
}

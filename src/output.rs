use crate::fetcher::{FetchReport, PullRequestRecord, RepoOutcome};
use crate::github;
use crate::stats::RepositorySummary;
use serde::Serialize;

/// Which statistics a summary table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// Mean with standard error and the window around the mean.
    Time,
    /// Mean with standard deviation and percentiles.
    Distribution,
}

const SUMMARY_PRECISION: usize = 2;

/// Formats the per-repository summary as an aligned text table.
pub fn format_summary_table(summaries: &[RepositorySummary], report: Report) -> String {
    let header: Vec<&str> = match report {
        Report::Time => vec!["repo", "PRs", "mean", "sem", "window_left", "window_right"],
        Report::Distribution => vec!["repo", "PRs", "mean", "std", "50%", "95%", "99%"],
    };

    let rows = summaries
        .iter()
        .map(|s| {
            let values = match report {
                Report::Time => vec![s.mean, s.std_error, s.window_left, s.window_right],
                Report::Distribution => vec![s.mean, s.std_dev, s.p50, s.p95, s.p99],
            };
            let mut row = vec![s.repo.to_string(), s.count.to_string()];
            row.extend(values.iter().map(|v| format!("{:.*}", SUMMARY_PRECISION, v)));
            row
        })
        .collect::<Vec<_>>();

    render_table(&header, &rows)
}

/// Formats raw records in the order given.
pub fn format_records_table(records: &[&PullRequestRecord]) -> String {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.repo.to_string(),
                r.number.to_string(),
                r.title.clone(),
                format!("{:.*}", SUMMARY_PRECISION, r.elapsed_hours),
            ]
        })
        .collect::<Vec<_>>();

    render_table(&["repo", "#", "title", "hours"], &rows)
}

/// A line for every repository that has no summary row, or `None` if it has one.
pub fn format_notice(repo: &impl std::fmt::Display, outcome: &RepoOutcome) -> Option<String> {
    match outcome {
        RepoOutcome::NoPullRequests => Some(format!(
            "Could not find any matching pull requests in '{}'",
            repo
        )),
        RepoOutcome::NoneQualified { closed, .. } => Some(format!(
            "No merged pull requests in '{}' matched the filter ({} closed)",
            repo, closed
        )),
        RepoOutcome::Qualified { .. } => None,
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summaries: &'a [RepositorySummary],
    empty: Vec<EmptyRepo<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<&'a PullRequestRecord>>,
}

#[derive(Serialize)]
struct EmptyRepo<'a> {
    repo: String,
    #[serde(flatten)]
    outcome: &'a RepoOutcome,
}

/// Renders the whole run as one JSON document. Records are included only when `verbose`.
pub fn format_json(
    summaries: &[RepositorySummary],
    report: &FetchReport,
    verbose: bool,
) -> serde_json::Result<String> {
    let doc = JsonReport {
        summaries,
        empty: report
            .empty_repos()
            .map(|(repo, outcome)| EmptyRepo {
                repo: repo.to_string(),
                outcome,
            })
            .collect(),
        records: verbose.then(|| report.records_by_elapsed_desc()),
    };
    serde_json::to_string_pretty(&doc)
}

/// The one message printed for a fatal error, with a hint when GitHub's reply allows one.
pub fn format_error(err: &anyhow::Error) -> String {
    match github::describe_github_error(err) {
        Some(hint) => format!("Error: {:#}\n{}", err, hint),
        None => format!("Error: {:#}", err),
    }
}

fn render_table<S: AsRef<str>>(header: &[S], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.as_ref().chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                // First column left-aligned, the numbers right-aligned.
                if i == 0 {
                    format!("{:<width$}", cell, width = *width)
                } else {
                    format!("{:>width$}", cell, width = *width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(header.iter().map(|h| h.as_ref()).collect())];
    lines.extend(
        rows.iter()
            .map(|row| format_row(row.iter().map(String::as_str).collect())),
    );
    lines.join("\n")
}

//! Retrieval and filtering of merged pull requests.
//!
//! Each repository is listed through a [`PullRequestSource`], every closed pull request is
//! checked against the merged and day-window predicates, and the survivors become
//! [`PullRequestRecord`]s. Repositories are independent, so they may be fetched
//! concurrently; results are always reported in input order.

use crate::config::RepoId;
use crate::github::{ClosedPullRequest, PullRequestSource};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// A merged pull request with its creation-to-merge latency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestRecord {
    pub repo: RepoId,
    pub number: u64,
    pub title: String,
    pub elapsed_hours: f64,
}

/// What happened to one repository during fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepoOutcome {
    /// The platform returned no closed pull requests at all.
    NoPullRequests,
    /// Closed pull requests exist but none survived filtering.
    NoneQualified { closed: usize, skipped: usize },
    Qualified {
        closed: usize,
        qualified: usize,
        skipped: usize,
    },
}

/// Why a closed pull request was or was not turned into a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Qualification {
    Qualified { elapsed_hours: f64 },
    NotMerged,
    OutsideWindow,
    /// Timestamps are missing or inconsistent with the merged flag.
    Inconsistent(&'static str),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub records: Vec<PullRequestRecord>,
    pub outcomes: Vec<(RepoId, RepoOutcome)>,
}

impl FetchReport {
    /// All records, longest-lived first.
    pub fn records_by_elapsed_desc(&self) -> Vec<&PullRequestRecord> {
        let mut sorted: Vec<_> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.elapsed_hours.total_cmp(&a.elapsed_hours));
        sorted
    }

    /// Repositories that produced no summary row, with their outcome.
    pub fn empty_repos(&self) -> impl Iterator<Item = &(RepoId, RepoOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !matches!(outcome, RepoOutcome::Qualified { .. }))
    }
}

/// Earliest creation time inside a window of `last_days` ending at `now`.
///
/// `None` means unbounded: either the window is disabled (`<= 0`) or it reaches past the
/// earliest representable time, so every creation time falls inside it.
pub fn window_start(last_days: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if last_days <= 0 {
        return None;
    }
    Duration::try_days(last_days).and_then(|days| now.checked_sub_signed(days))
}

/// Decides whether a closed pull request counts towards the latency statistics.
///
/// A `last_days` of zero or less disables the window.
pub fn qualify(pr: &ClosedPullRequest, last_days: i64, now: DateTime<Utc>) -> Qualification {
    if !pr.merged {
        return Qualification::NotMerged;
    }

    let Some(created_at) = pr.created_at else {
        return Qualification::Inconsistent("missing created_at");
    };

    if window_start(last_days, now).is_some_and(|start| created_at < start) {
        return Qualification::OutsideWindow;
    }

    let Some(merged_at) = pr.merged_at else {
        return Qualification::Inconsistent("merged without merged_at");
    };

    let elapsed = merged_at - created_at;
    if elapsed < Duration::zero() {
        return Qualification::Inconsistent("merged before it was created");
    }

    Qualification::Qualified {
        elapsed_hours: elapsed.num_milliseconds() as f64 / MILLIS_PER_HOUR,
    }
}

/// Filters one repository's closed pull requests into records.
pub fn filter_repo(
    repo_id: &RepoId,
    prs: Vec<ClosedPullRequest>,
    last_days: i64,
    now: DateTime<Utc>,
) -> (Vec<PullRequestRecord>, RepoOutcome) {
    if prs.is_empty() {
        tracing::info!(repo = %repo_id, "Could not find any matching pull requests");
        return (Vec::new(), RepoOutcome::NoPullRequests);
    }

    let closed = prs.len();
    let mut skipped = 0;
    let mut records = Vec::new();

    for pr in prs {
        match qualify(&pr, last_days, now) {
            Qualification::Qualified { elapsed_hours } => records.push(PullRequestRecord {
                repo: repo_id.clone(),
                number: pr.number,
                title: pr.title,
                elapsed_hours,
            }),
            Qualification::NotMerged | Qualification::OutsideWindow => {}
            Qualification::Inconsistent(reason) => {
                tracing::warn!(repo = %repo_id, number = pr.number, "Skipping pull request: {}", reason);
                skipped += 1;
            }
        }
    }

    let outcome = if records.is_empty() {
        RepoOutcome::NoneQualified { closed, skipped }
    } else {
        RepoOutcome::Qualified {
            closed,
            qualified: records.len(),
            skipped,
        }
    };

    tracing::debug!(repo = %repo_id, closed, qualified = records.len(), skipped, "Filtered pull requests");

    (records, outcome)
}

/// Fetches and filters pull requests for every repository.
///
/// # Arguments
/// * `source` - Where closed pull requests come from.
/// * `repos` - Repositories to analyze; the report keeps this order.
/// * `last_days` - Only count PRs created within this many days of `now`. `<= 0` means all.
/// * `now` - The reference point for the day window.
/// * `concurrency` - Maximum number of repositories fetched at once.
///
/// The first client error aborts the whole fetch.
pub async fn fetch_records<S: PullRequestSource>(
    source: &S,
    repos: &[RepoId],
    last_days: i64,
    now: DateTime<Utc>,
    concurrency: usize,
) -> Result<FetchReport> {
    let since = window_start(last_days, now);
    let fetched: Vec<(&RepoId, Vec<ClosedPullRequest>)> = stream::iter(repos)
        .map(|repo_id| async move {
            tracing::info!(repo = %repo_id, "Fetching closed pull requests");
            let prs = source.closed_pull_requests(repo_id, since).await?;
            Ok::<_, anyhow::Error>((repo_id, prs))
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut report = FetchReport::default();
    for (repo_id, prs) in fetched {
        let (records, outcome) = filter_repo(repo_id, prs, last_days, now);
        report.records.extend(records);
        report.outcomes.push((repo_id.clone(), outcome));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn repo() -> RepoId {
        "owner/repo".parse().unwrap()
    }

    fn merged_pr(
        number: u64,
        title: &str,
        created: DateTime<Utc>,
        merged: DateTime<Utc>,
    ) -> ClosedPullRequest {
        ClosedPullRequest {
            number,
            title: title.to_string(),
            created_at: Some(created),
            merged_at: Some(merged),
            merged: true,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_elapsed_hours_is_exact() {
        let created = Utc.with_ymd_and_hms(2024, 5, 30, 9, 0, 0).unwrap();
        let pr = merged_pr(1, "a", created, created + Duration::minutes(90));

        assert_eq!(
            qualify(&pr, 0, now()),
            Qualification::Qualified { elapsed_hours: 1.5 }
        );
    }

    #[test]
    fn test_unmerged_never_qualifies() {
        let created = Utc.with_ymd_and_hms(2024, 5, 30, 9, 0, 0).unwrap();
        let pr = ClosedPullRequest {
            number: 1,
            title: "abandoned".to_string(),
            created_at: Some(created),
            merged_at: None,
            merged: false,
        };

        for window in [0, 1, 30, 3650] {
            assert_eq!(qualify(&pr, window, now()), Qualification::NotMerged);
        }
    }

    #[test]
    fn test_window_excludes_old_prs() {
        let created = now() - Duration::days(10);
        let pr = merged_pr(1, "old", created, created + Duration::hours(1));

        assert_eq!(qualify(&pr, 7, now()), Qualification::OutsideWindow);
        assert!(matches!(qualify(&pr, 10, now()), Qualification::Qualified { .. }));
        assert!(matches!(qualify(&pr, 30, now()), Qualification::Qualified { .. }));
    }

    #[test]
    fn test_no_window_keeps_ancient_prs() {
        let created = now() - Duration::days(3650);
        let pr = merged_pr(1, "ancient", created, created + Duration::hours(2));

        assert_eq!(
            qualify(&pr, 0, now()),
            Qualification::Qualified { elapsed_hours: 2.0 }
        );
        assert_eq!(
            qualify(&pr, -5, now()),
            Qualification::Qualified { elapsed_hours: 2.0 }
        );
    }

    #[test]
    fn test_huge_window_is_unbounded() {
        let created = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        let pr = merged_pr(1, "ancient", created, created + Duration::hours(2));

        for window in [100_000_000, i64::MAX / 86_400, i64::MAX] {
            assert_eq!(window_start(window, now()), None, "window {window}");
            assert_eq!(
                qualify(&pr, window, now()),
                Qualification::Qualified { elapsed_hours: 2.0 }
            );
        }
    }

    #[test]
    fn test_window_start() {
        assert_eq!(window_start(0, now()), None);
        assert_eq!(window_start(-3, now()), None);
        assert_eq!(window_start(7, now()), Some(now() - Duration::days(7)));
    }

    #[test]
    fn test_inconsistent_timestamps_are_skipped() {
        let created = now() - Duration::days(1);
        let mut missing_merge = merged_pr(1, "a", created, created);
        missing_merge.merged_at = None;
        let backwards = merged_pr(2, "b", created, created - Duration::hours(1));
        let mut missing_created = merged_pr(3, "c", created, created);
        missing_created.created_at = None;
        let fine = merged_pr(4, "d", created, created + Duration::hours(3));

        assert!(matches!(qualify(&missing_merge, 0, now()), Qualification::Inconsistent(_)));
        assert!(matches!(qualify(&backwards, 0, now()), Qualification::Inconsistent(_)));
        assert!(matches!(qualify(&missing_created, 0, now()), Qualification::Inconsistent(_)));

        let (records, outcome) = filter_repo(
            &repo(),
            vec![missing_merge, backwards, missing_created, fine],
            0,
            now(),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 4);
        assert_eq!(
            outcome,
            RepoOutcome::Qualified {
                closed: 4,
                qualified: 1,
                skipped: 3
            }
        );
    }

    #[test]
    fn test_duplicate_titles_are_kept() {
        let created = now() - Duration::days(1);
        let prs = vec![
            merged_pr(1, "Bump deps", created, created + Duration::hours(1)),
            merged_pr(2, "Bump deps", created, created + Duration::hours(5)),
        ];

        let (records, _) = filter_repo(&repo(), prs, 0, now());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].elapsed_hours, 1.0);
        assert_eq!(records[1].elapsed_hours, 5.0);
    }

    #[test]
    fn test_empty_listing_vs_nothing_qualified() {
        let (records, outcome) = filter_repo(&repo(), vec![], 0, now());
        assert!(records.is_empty());
        assert_eq!(outcome, RepoOutcome::NoPullRequests);

        let created = now() - Duration::days(100);
        let old = merged_pr(1, "old", created, created + Duration::hours(1));
        let (records, outcome) = filter_repo(&repo(), vec![old], 7, now());
        assert!(records.is_empty());
        assert_eq!(outcome, RepoOutcome::NoneQualified { closed: 1, skipped: 0 });
    }

    #[test]
    fn test_records_by_elapsed_desc() {
        let report = FetchReport {
            records: [3.0, 9.0, 1.0]
                .into_iter()
                .enumerate()
                .map(|(i, elapsed_hours)| PullRequestRecord {
                    repo: repo(),
                    number: i as u64,
                    title: format!("pr {i}"),
                    elapsed_hours,
                })
                .collect(),
            outcomes: vec![],
        };

        let hours: Vec<f64> = report
            .records_by_elapsed_desc()
            .iter()
            .map(|r| r.elapsed_hours)
            .collect();
        assert_eq!(hours, vec![9.0, 3.0, 1.0]);
    }
}

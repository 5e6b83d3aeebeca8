use crate::config::RepoId;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use octocrab::models::pulls::PullRequest;
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A closed pull request as reported by the hosting platform.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClosedPullRequest {
    pub number: u64,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged: bool,
}

/// Anything that can list the closed pull requests of a repository.
///
/// `since` is a hint: a source may stop early once it only sees pull requests created
/// before it, but returning older ones is fine since the caller filters again.
pub trait PullRequestSource {
    fn closed_pull_requests(
        &self,
        repo_id: &RepoId,
        since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<ClosedPullRequest>>> + Send;
}

#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    max_pages: u32,
}

impl GitHubClient {
    pub fn new(token: Option<String>, max_pages: u32) -> Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }

        Ok(Self {
            octocrab: builder.build().context("Failed to create GitHub client")?,
            max_pages,
        })
    }

    async fn list_closed(
        &self,
        repo_id: &RepoId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ClosedPullRequest>> {
        let mut current_page = self
            .octocrab
            .pulls(&repo_id.owner, &repo_id.repo)
            .list()
            .state(octocrab::params::State::Closed)
            .sort(octocrab::params::pulls::Sort::Created)
            .direction(octocrab::params::Direction::Descending)
            .per_page(100)
            .send()
            .await?;

        let mut prs = convert_page(&current_page);
        let mut page_count = 1;

        loop {
            if reached_cutoff(&prs, since) {
                break;
            }

            if page_count >= self.max_pages {
                if current_page.next.is_some() {
                    tracing::warn!(
                        repo = %repo_id,
                        "Hit max_github_api_pages ({}) before the last page. Data may be incomplete.",
                        self.max_pages
                    );
                }
                break;
            }

            match self.octocrab.get_page(&current_page.next).await? {
                Some(next_page) => {
                    current_page = next_page;
                    page_count += 1;
                    prs.extend(convert_page(&current_page));
                }
                None => break,
            }
        }

        tracing::debug!(repo = %repo_id, pages = page_count, count = prs.len(), "Listed closed pull requests");

        Ok(prs)
    }
}

impl PullRequestSource for GitHubClient {
    async fn closed_pull_requests(
        &self,
        repo_id: &RepoId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ClosedPullRequest>> {
        self.list_closed(repo_id, since)
            .await
            .with_context(|| format!("Failed to list closed pull requests for {}", repo_id))
    }
}

fn convert_page(page: &Page<PullRequest>) -> Vec<ClosedPullRequest> {
    page.items.iter().map(convert_pull_request).collect()
}

fn convert_pull_request(pr: &PullRequest) -> ClosedPullRequest {
    ClosedPullRequest::from_listing(
        pr.number,
        pr.title.clone().unwrap_or_default(),
        pr.created_at,
        pr.merged_at,
    )
}

impl ClosedPullRequest {
    /// The list payload carries no merged flag, so a merge timestamp is what marks a merge.
    pub fn from_listing(
        number: u64,
        title: String,
        created_at: Option<DateTime<Utc>>,
        merged_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            number,
            title,
            created_at,
            merged: merged_at.is_some(),
            merged_at,
        }
    }
}

/// Pages arrive newest first, so once the oldest PR seen so far predates `since`
/// no later page can hold anything inside the window.
fn reached_cutoff(prs: &[ClosedPullRequest], since: Option<DateTime<Utc>>) -> bool {
    let Some(since) = since else {
        return false;
    };
    prs.last()
        .and_then(|pr| pr.created_at)
        .is_some_and(|created_at| created_at < since)
}

/// Returns a short explanation for GitHub errors the user can act on.
pub fn describe_github_error(err: &anyhow::Error) -> Option<&'static str> {
    let octocrab::Error::GitHub { source, .. } = err.downcast_ref::<octocrab::Error>()? else {
        return None;
    };

    let message = source.message.to_lowercase();
    if message.contains("rate limit") {
        Some("GitHub rate limit exceeded; pass --token or set GITHUB_TOKEN")
    } else if message.contains("not found") {
        Some("Repository not found or not accessible with the given credentials")
    } else if message.contains("bad credentials") {
        Some("GitHub rejected the token")
    } else {
        None
    }
}

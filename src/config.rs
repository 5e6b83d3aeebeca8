//! Application configuration and environment variable parsing.
//!
//! Settings are read from the environment (optionally seeded from a `.env` file).
//! Command-line flags override whatever is configured here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid repository '{0}', expected owner/name")]
pub struct RepoIdError(pub String);

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').map(str::trim).collect();
        match parts.as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(RepoId {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(RepoIdError(s.to_string())),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Optional GitHub Personal Access Token, used when `--token` is not given.
    pub github_token: Option<String>,

    /// Hard limit on the number of paginated requests to make to the GitHub API per repository.
    #[serde(default = "default_max_pages")]
    pub max_github_api_pages: u32,

    /// How many repositories are fetched at the same time. 1 fetches sequentially.
    #[serde(default = "default_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_max_pages() -> u32 {
    100
}

fn default_concurrency() -> usize {
    1
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // A missing .env file is fine; the process environment still applies.
        let _ = dotenvy::dotenv();
        envy::from_env()
    }
}

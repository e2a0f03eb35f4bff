use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A merged pull request, reduced to what the cycle-time report needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    /// Pull request number, unique within the repository.
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub merged_at: DateTime<Utc>,
    /// Distinct logins that left an approving review.
    pub reviewers: HashSet<String>,
}

impl PullRequest {
    pub fn reviewer_count(&self) -> usize {
        self.reviewers.len()
    }

    /// Approver logins in alphabetical order.
    pub fn reviewer_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.reviewers.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn cycle_time(&self) -> chrono::Duration {
        self.merged_at - self.created_at
    }
}

//! GitHub GraphQL transport.
//!
//! Holds the wire shape of one page of merged pull requests, the query that produces it,
//! and `GitHubClient`, the octocrab-backed `PageSource` used by the paginator.

use crate::types::{PullRequest, RepoId};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Review state that counts as an approval.
const APPROVED: &str = "APPROVED";

/// Login GitHub shows for reviews whose author account was deleted.
const GHOST_LOGIN: &str = "ghost";

const MERGED_PULL_REQUESTS_QUERY: &str = r#"
query MergedPullRequests($owner: String!, $name: String!, $pageSize: Int!, $before: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(last: $pageSize, states: MERGED, orderBy: {field: UPDATED_AT, direction: ASC}, before: $before) {
      pageInfo {
        startCursor
        hasNextPage
        hasPreviousPage
        endCursor
      }
      edges {
        node {
          title
          url
          mergedAt
          createdAt
          number
          reviews(first: 100) {
            edges {
              node {
                state
                author {
                  login
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'static str,
    variables: PageVariables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageVariables<'a> {
    owner: &'a str,
    name: &'a str,
    page_size: u32,
    /// `None` serializes as `null`, which asks for the most recent page.
    before: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<PageData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PageData {
    pub repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub pull_requests: PullRequestConnection,
}

/// One page of merged pull requests, as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestConnection {
    pub page_info: PageInfo,
    pub edges: Vec<PullRequestEdge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: Option<String>,
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestEdge {
    pub node: PullRequestNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub title: String,
    pub url: String,
    pub merged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub number: u64,
    pub reviews: ReviewConnection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewConnection {
    pub edges: Vec<ReviewEdge>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewEdge {
    pub node: ReviewNode,
}

#[derive(Debug, Deserialize)]
pub struct ReviewNode {
    pub state: String,
    pub author: Option<Actor>,
}

#[derive(Debug, Deserialize)]
pub struct Actor {
    pub login: String,
}

impl From<PullRequestNode> for PullRequest {
    fn from(node: PullRequestNode) -> Self {
        let reviewers = node
            .reviews
            .edges
            .into_iter()
            .map(|edge| edge.node)
            .filter(|review| review.state == APPROVED)
            .map(|review| {
                review
                    .author
                    .map_or_else(|| GHOST_LOGIN.to_string(), |author| author.login)
            })
            .collect();

        PullRequest {
            id: node.number,
            created_at: node.created_at,
            merged_at: node.merged_at,
            reviewers,
        }
    }
}

impl GraphQlResponse {
    /// Unwraps the pull request page, turning GraphQL-level failures into errors.
    pub fn into_page(self, repo_id: &RepoId) -> Result<PullRequestConnection> {
        if let Some(errors) = self.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            bail!("GitHub GraphQL errors: {}", messages.join("; "));
        }

        match self.data.and_then(|data| data.repository) {
            Some(repository) => Ok(repository.pull_requests),
            None => bail!("Repository {} not found", repo_id),
        }
    }
}

/// Anything that can hand out pages of merged pull requests, newest first.
pub trait PageSource {
    /// Fetches the page that ends right before `before`, or the most recent page for `None`.
    fn fetch_page(
        &self,
        before: Option<&str>,
    ) -> impl Future<Output = Result<PullRequestConnection>> + Send;
}

#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    repo_id: RepoId,
    page_size: u32,
}

impl GitHubClient {
    pub fn new(token: String, api_url: &str, repo_id: RepoId, page_size: u32) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token)
            .base_uri(api_url)
            .with_context(|| format!("invalid GitHub API URL '{}'", api_url))?
            .add_retry_config(RetryConfig::None)
            .build()
            .context("failed to build GitHub client")?;

        Ok(Self {
            octocrab,
            repo_id,
            page_size,
        })
    }
}

impl PageSource for GitHubClient {
    async fn fetch_page(&self, before: Option<&str>) -> Result<PullRequestConnection> {
        let request = GraphQlRequest {
            query: MERGED_PULL_REQUESTS_QUERY,
            variables: PageVariables {
                owner: &self.repo_id.owner,
                name: &self.repo_id.repo,
                page_size: self.page_size,
                before,
            },
        };

        let response: GraphQlResponse = self
            .octocrab
            .post("/graphql", Some(&request))
            .await
            .with_context(|| format!("GraphQL request for {} failed", self.repo_id))?;

        response.into_page(&self.repo_id)
    }
}

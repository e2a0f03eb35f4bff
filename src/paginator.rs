//! Backward cursor walk over the merged pull requests of a repository.
//!
//! `Paginator` starts at the most recent page and keeps requesting the page before the
//! current one until the last pull request it has collected was merged before the report
//! window opens. Nothing is filtered here; the accumulated records are handed to the
//! reporter as-is, in arrival order.
//!
//! Every request is preceded by a fixed pause to stay under the API rate limit. Any failure
//! ends the walk immediately and is returned to the caller; there is no retry.

use crate::github::{PageSource, PullRequestConnection};
use crate::types::PullRequest;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::time::Duration as StdDuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    /// The last collected pull request was merged before the window start.
    ReachedWindowStart,
    /// The API has no older page to give.
    Exhausted,
    /// The configured page limit was hit.
    PageLimit,
}

pub struct Paginator<S> {
    source: S,
    window_start: DateTime<Utc>,
    delay: StdDuration,
    max_pages: Option<u32>,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S, window_start: DateTime<Utc>, delay: StdDuration) -> Self {
        Self {
            source,
            window_start,
            delay,
            max_pages: None,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Collects merged pull requests, newest page first, until paging can stop.
    pub async fn fetch_all(&self) -> anyhow::Result<Vec<PullRequest>> {
        let mut prs = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count: u32 = 0;

        let reason = loop {
            tokio::time::sleep(self.delay).await;

            let page = self
                .source
                .fetch_page(cursor.as_deref())
                .await
                .with_context(|| format!("failed to fetch page {}", page_count + 1))?;
            page_count += 1;

            let PullRequestConnection { page_info, edges } = page;
            let received = edges.len();
            prs.extend(edges.into_iter().map(|edge| PullRequest::from(edge.node)));

            tracing::debug!(
                page = page_count,
                before = cursor.as_deref().unwrap_or("null"),
                received,
                total = prs.len(),
                "Fetched page of merged pull requests"
            );

            // Only the last record is inspected, so pages that are not ordered by merge
            // time can end the walk early or late.
            if prs.len() > 1
                && prs
                    .last()
                    .is_some_and(|pr| pr.merged_at < self.window_start)
            {
                break StopReason::ReachedWindowStart;
            }

            let next_cursor = match page_info.start_cursor {
                Some(start) if !start.is_empty() && cursor.as_deref() != Some(start.as_str()) => {
                    start
                }
                _ => break StopReason::Exhausted,
            };
            if received == 0 || !page_info.has_previous_page {
                break StopReason::Exhausted;
            }

            if self.max_pages.is_some_and(|max| page_count >= max) {
                break StopReason::PageLimit;
            }

            cursor = Some(next_cursor);
        };

        match reason {
            StopReason::PageLimit => tracing::warn!(
                "Hit max_github_api_pages ({}) before reaching {}. Data may be incomplete.",
                page_count,
                self.window_start
            ),
            _ => tracing::info!(
                pages = page_count,
                pull_requests = prs.len(),
                reason = ?reason,
                "Finished paging merged pull requests"
            ),
        }

        Ok(prs)
    }
}

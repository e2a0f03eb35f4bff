pub mod config;
pub mod fetcher;
pub mod github;
pub mod paginator;
pub mod report;
pub mod types;

use config::AppConfig;
use github::GitHubClient;

/// Runs one report: fetches the merged pull requests of the configured repository and
/// returns the CSV for the configured month.
///
/// Every failure is fatal to the run. The caller gets either the complete CSV or an error,
/// never partial output.
pub async fn run(config: &AppConfig, token: String) -> anyhow::Result<String> {
    let repo_id = config.repo_id();
    tracing::info!(repo_id = %repo_id, month = %config.report_month, "Building cycle-time report");

    let client = GitHubClient::new(token, &config.github_api_url, repo_id, config.page_size)?;
    fetcher::fetch_and_render(client, config).await
}

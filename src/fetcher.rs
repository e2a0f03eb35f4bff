use crate::config::AppConfig;
use crate::github::PageSource;
use crate::paginator::Paginator;
use crate::report;
use anyhow::Result;

/// Pages merged pull requests from `source` and renders the cycle-time CSV.
///
/// This function separates the logic of data retrieval and processing
/// from the CLI layer. Nothing is rendered unless every page was fetched.
pub async fn fetch_and_render<S: PageSource>(source: S, config: &AppConfig) -> Result<String> {
    let prs = Paginator::new(source, config.report_month.start(), config.page_delay())
        .with_max_pages(config.max_github_api_pages)
        .fetch_all()
        .await?;

    Ok(report::render(&prs, &config.report_month))
}

//! Application configuration and environment variable parsing.
//!
//! This module handles loading configuration settings from the environment (e.g., .env file).
//! It defines the `AppConfig` struct which governs which repository is queried, which month
//! is reported on, and how fast the GitHub API is paged. Every setting has a default, so an
//! empty environment reports August 2022 for `smartpension/api`.

use crate::report::ReportMonth;
use crate::types::RepoId;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::time::Duration as StdDuration;

/// GitHub caps connection pages at 100 nodes.
const MAX_PAGE_SIZE: u32 = 100;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// The owner of the repository to report on (e.g., "smartpension").
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    /// The name of the repository to report on (e.g., "api").
    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// The calendar month whose merged pull requests are reported.
    /// Expected format: "YYYY-MM". Example: "2022-08"
    #[serde(
        default = "default_report_month",
        deserialize_with = "deserialize_report_month"
    )]
    pub report_month: ReportMonth,

    /// Number of pull requests requested per GraphQL page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Fixed pause before every GraphQL request, in seconds.
    #[serde(default = "default_page_delay_seconds")]
    pub page_delay_seconds: u64,

    /// Optional hard limit on the number of pages fetched per run. Must be at least 1.
    pub max_github_api_pages: Option<u32>,

    /// Base URL of the GitHub API. The GraphQL endpoint lives at `<base>/graphql`.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
}

fn default_repo_owner() -> String {
    "smartpension".to_string()
}

fn default_repo_name() -> String {
    "api".to_string()
}

fn default_report_month() -> ReportMonth {
    ReportMonth::new(2022, 8).expect("August 2022 is a valid month")
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_page_delay_seconds() -> u64 {
    2
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            report_month: default_report_month(),
            page_size: default_page_size(),
            page_delay_seconds: default_page_delay_seconds(),
            max_github_api_pages: None,
            github_api_url: default_github_api_url(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let config: Self = envy::from_env().context("failed to read configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            bail!(
                "PAGE_SIZE must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.page_size
            );
        }
        if self.max_github_api_pages == Some(0) {
            bail!("MAX_GITHUB_API_PAGES must be at least 1 when set");
        }
        if self.repo_owner.trim().is_empty() || self.repo_name.trim().is_empty() {
            bail!("REPO_OWNER and REPO_NAME must not be empty");
        }
        Ok(())
    }

    pub fn repo_id(&self) -> RepoId {
        RepoId {
            owner: self.repo_owner.trim().to_string(),
            repo: self.repo_name.trim().to_string(),
        }
    }

    pub fn page_delay(&self) -> StdDuration {
        StdDuration::from_secs(self.page_delay_seconds)
    }
}

/// Checks the token passed on the command line.
///
/// A missing or blank token is a configuration error and must stop the run before any
/// request is made.
pub fn require_token(token: Option<&str>) -> anyhow::Result<String> {
    match token.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => bail!("NEED TOKEN! pass a GitHub personal access token with -t"),
    }
}

fn deserialize_report_month<'de, D>(deserializer: D) -> Result<ReportMonth, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.trim().parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 7] = [
        "REPO_OWNER",
        "REPO_NAME",
        "REPORT_MONTH",
        "PAGE_SIZE",
        "PAGE_DELAY_SECONDS",
        "MAX_GITHUB_API_PAGES",
        "GITHUB_API_URL",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var("REPO_OWNER", "rust-lang");
        env::set_var("REPO_NAME", "cargo");
        env::set_var("REPORT_MONTH", "2023-12");
        env::set_var("PAGE_SIZE", "50");
        env::set_var("PAGE_DELAY_SECONDS", "0");
        env::set_var("MAX_GITHUB_API_PAGES", "7");
        env::set_var("GITHUB_API_URL", "http://localhost:8080");

        let config = AppConfig::from_env().expect("Failed to load config");

        assert_eq!(config.repo_id().to_string(), "rust-lang/cargo");
        assert_eq!(config.report_month.to_string(), "2023-12");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.page_delay(), StdDuration::ZERO);
        assert_eq!(config.max_github_api_pages, Some(7));
        assert_eq!(config.github_api_url, "http://localhost:8080");

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_defaults_match_reference_run() {
        clear_vars();

        let config = AppConfig::from_env().expect("Failed to load config");

        assert_eq!(config.repo_id().to_string(), "smartpension/api");
        assert_eq!(config.report_month.to_string(), "2022-08");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.page_delay(), StdDuration::from_secs(2));
        assert_eq!(config.max_github_api_pages, None);
    }

    #[test]
    #[serial]
    fn test_config_rejects_bad_month() {
        clear_vars();
        env::set_var("REPORT_MONTH", "2022-13");

        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_rejects_oversized_page() {
        clear_vars();
        env::set_var("PAGE_SIZE", "101");

        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_rejects_zero_page_limit() {
        clear_vars();
        env::set_var("MAX_GITHUB_API_PAGES", "0");

        let result = AppConfig::from_env();
        assert!(result.is_err());

        clear_vars();
    }

    #[test]
    fn test_require_token() {
        assert_eq!(require_token(Some(" abc ")).unwrap(), "abc");
        assert!(require_token(Some("")).is_err());
        assert!(require_token(Some("   ")).is_err());
        assert!(require_token(None).is_err());
    }
}

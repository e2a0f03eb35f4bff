use clap::Parser;
use pr_cycle_time::config::{self, AppConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Print a CSV of cycle times for the pull requests merged in the report month.
#[derive(Parser, Debug)]
#[command(name = "pr-cycle-time", version, about)]
struct Cli {
    /// GitHub personal access token
    #[arg(short = 't', long = "token", value_name = "TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries only the CSV.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pr_cycle_time=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let token = match config::require_token(cli.token.as_deref()) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Any failure while paging is fatal: the run aborts without printing a partial report.
    match pr_cycle_time::run(&config, token).await {
        Ok(csv) => print!("{}", csv),
        Err(e) => {
            tracing::error!("Report failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

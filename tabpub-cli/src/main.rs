//! tabpub: publish changed Tableau workbooks from a pull request.
//!
//! # Usage
//!
//! ```text
//! tabpub --repo-token <TOKEN> [--workbook-dir <DIR>] [--merge-duplicates]
//! ```
//!
//! Runs inside a pull-request workflow. Repository, event payload and Tableau
//! credentials come from the environment (see [`settings`]). Exit status is 0
//! when every changed workbook published or there was nothing to publish, 1
//! otherwise.

mod settings;
mod summary;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use settings::Settings;
use tabpub_core::DuplicatePolicy;
use tabpub_github::{read_pull_request_id, GitHubClient};
use tabpub_publish::{
    pipeline::{self, RunConfig, RunOutcome},
    PullRequestComment,
};
use tabpub_tableau::TableauGateway;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tabpub",
    version,
    about = "Publish Tableau workbooks changed by a pull request and report back on it",
    long_about = None,
)]
struct Cli {
    /// Token used to read the pull request and post the report comment.
    #[arg(long, alias = "repo_token")]
    repo_token: String,

    /// Directory holding the workbooks and their YAML config, relative to the checkout.
    #[arg(long, alias = "workbook_dir", default_value = "workbooks")]
    workbook_dir: String,

    /// Merge entries that declare the same workbook file instead of keeping the last one.
    #[arg(long)]
    merge_duplicates: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || match run(cli) {
        Ok(outcome) => {
            for line in summary::summary_lines(&outcome) {
                println!("{line}");
            }
            ExitCode::from(outcome.exit_code())
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "run aborted");
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    })
}

fn run(cli: Cli) -> Result<RunOutcome> {
    let settings = Settings::from_env()?;
    let pull_request = read_pull_request_id(&settings.event_path)
        .context("cannot identify the pull request for this run")?;
    let checkout_root = std::env::current_dir().context("cannot determine the checkout root")?;
    tracing::info!(
        repository = %settings.repository,
        pull_request = %pull_request,
        workbook_dir = %cli.workbook_dir,
        "starting publish run"
    );

    let host = GitHubClient::new(
        &settings.github_api_url,
        settings.repository,
        SecretString::from(cli.repo_token),
    );
    let mut gateway = TableauGateway::new(settings.tableau);
    let mut sink = PullRequestComment::new(&host, pull_request);

    let mut config = RunConfig::new(checkout_root, cli.workbook_dir, pull_request);
    if cli.merge_duplicates {
        config.duplicates = DuplicatePolicy::Merge;
    }

    let result = pipeline::run(&config, &host, &mut gateway, &mut sink);
    gateway.sign_out();
    Ok(result?)
}

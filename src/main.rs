//! CLI entry point for notion-backup.

use std::process::ExitCode;

use clap::Parser;
use notion_backup::{BackupOrchestrator, Credentials, NotionClient, run_with_shutdown};
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let credentials = match Credentials::from_env(args.require_file_token) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(code = e.code(), "{e}");
            return ExitCode::FAILURE;
        }
    };
    let config = args.into_config(credentials);
    if let Err(e) = config.validate() {
        error!(code = e.code(), "{e}");
        return ExitCode::FAILURE;
    }

    let client = match NotionClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(code = e.code(), "{e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        formats = ?config.formats,
        output_dir = %config.output_dir.display(),
        "Starting backup"
    );
    let orchestrator = BackupOrchestrator::new(&client, config);

    match run_with_shutdown(&orchestrator).await {
        Ok(Some(summary)) if summary.all_failed() => ExitCode::FAILURE,
        Ok(Some(_)) => ExitCode::SUCCESS,
        Ok(None) => ExitCode::from(130),
        Err(e) => {
            error!(code = e.code(), "{e}");
            ExitCode::FAILURE
        }
    }
}

//! `metadetect` command-line entry point.
//!
//! Configuration comes from the environment (and `.env`); the caller from
//! `--user-id`/`--token` or METADETECT_USER_ID/METADETECT_TOKEN.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use metadetect_cli::commands::{self, Cli};
use metadetect_cli::report::{error_summary, log_error};
use metadetect_cli::{init_tracing, wiring};
use metadetect_core::Config;

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format());

    let app = wiring::build_app(&config, cli.identity.caller()).await?;
    commands::run(cli.command, &app).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log_error(&err);
            eprintln!("{}", error_summary(&err));
            ExitCode::FAILURE
        }
    }
}

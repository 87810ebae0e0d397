//! Command-line surface.

mod analysis;
mod images;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use metadetect_core::CallerIdentity;
use serde::Serialize;
use uuid::Uuid;

use crate::wiring::App;

pub use images::{content_type_for, ImageCommands};

#[derive(Parser)]
#[command(name = "metadetect", about = "MetaDetect provenance analysis CLI")]
pub struct Cli {
    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who the commands run as.
#[derive(Args)]
pub struct IdentityArgs {
    /// Caller user id
    #[arg(long, env = "METADETECT_USER_ID", global = true)]
    pub user_id: Option<Uuid>,

    /// Caller access token, forwarded to object storage
    #[arg(long, env = "METADETECT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,
}

impl IdentityArgs {
    /// `None` without a user id; the services then reject the call.
    pub fn caller(&self) -> Option<CallerIdentity> {
        self.user_id
            .map(|user_id| CallerIdentity::new(user_id, self.token.clone().unwrap_or_default()))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a provenance analysis on an image and wait for the result
    Analyze {
        /// Image UUID
        image_id: Uuid,
    },
    /// Show the status of an analysis
    Status {
        /// Analysis UUID
        analysis_id: Uuid,
    },
    /// Print the stored manifest of an analysis
    Manifest {
        /// Analysis UUID
        analysis_id: Uuid,
        /// Print only the active manifest entry
        #[arg(long)]
        summary: bool,
    },
    /// Compare two images
    Compare {
        /// Left image UUID
        left: Uuid,
        /// Right image UUID
        right: Uuid,
    },
    /// List analyses of an image, newest first
    History {
        /// Image UUID
        image_id: Uuid,
        /// Show only the most recent analysis
        #[arg(long)]
        latest: bool,
    },
    /// Image operations
    Images {
        #[command(subcommand)]
        sub: ImageCommands,
    },
}

pub(crate) fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

pub async fn run(command: Commands, app: &App) -> Result<()> {
    match command {
        Commands::Analyze { image_id } => analysis::analyze(app, image_id).await,
        Commands::Status { analysis_id } => analysis::status(app, analysis_id).await,
        Commands::Manifest {
            analysis_id,
            summary,
        } => analysis::manifest(app, analysis_id, summary).await,
        Commands::Compare { left, right } => analysis::compare(app, left, right).await,
        Commands::History { image_id, latest } => analysis::history(app, image_id, latest).await,
        Commands::Images { sub } => images::run(app, sub).await,
    }
}

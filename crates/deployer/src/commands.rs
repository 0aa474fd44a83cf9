/// `deploy` subcommand.
mod deploy;

pub(crate) use deploy::deploy;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Build directory deployed when no path is provided.
const DEFAULT_PATH: &str = "build";

/// CLI configuration.
#[derive(Parser)]
#[command(about, version)]
pub(crate) struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Redeploy the previously deployed build directory.
    Deploy(Deploy),
}

/// `deploy` subcommand configuration.
#[derive(Args)]
pub struct Deploy {
    /// Build directory to archive and upload.
    #[arg(default_value = DEFAULT_PATH)]
    path: PathBuf,
}

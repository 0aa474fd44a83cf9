//! # Site deployer
//!
//! Packages a local build directory into a ZIP archive and uploads it
//! to a hosted deployment API as a new deploy of a site.
//!
//! # Deployment flow
//!
//! The `deploy` subcommand runs four stages in order, stopping at the first failure:
//!
//! 1. The site identifier is resolved (see [`site`]). Depending on configuration it is either
//!    reused from the env file, discovered from the account's site list or freshly created.
//! 2. The build directory is archived without a wrapping root folder (see [`archiver`]).
//! 3. The archive is uploaded as a raw `application/zip` request body (see [`submit`]).
//! 4. The resulting deploy identifier is printed.
//!
//! # Exit codes
//!
//! Each failure class maps to its own exit code, see [`ErrorKind`].
//!
//! [`ErrorKind`]: error::ErrorKind

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::process::ExitCode;

use clap::Parser;
use commands::{Cli, Commands};
use common::{config::Logging, logging};
use config::DeployConfig;
use error::ErrorKind;
use indicatif::ProgressBar;
use progress::ProgressWriter;
use tracing::error;

/// Deployment API client.
mod api;

/// Build directory archiving utilities.
mod archiver;

/// CLI subcommands.
mod commands;

/// Deployment configuration.
mod config;

/// Failure classes and exit codes.
mod error;

/// Spinner-aware log output.
mod progress;

/// Site identifier resolution.
mod site;

/// Deploy submission.
mod submit;

/// Shared test helpers.
#[cfg(test)]
mod testing;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match DeployConfig::new() {
        Ok(config) => config,
        Err(err) => {
            logging::init(&Logging::default());
            error!("unable to load configuration: {err}");
            return ExitCode::from(ErrorKind::Precondition.exit_code());
        }
    };

    let pg = ProgressBar::new_spinner();

    let writer = pg.clone();
    logging::init_with_writer(&config.logging, move || {
        ProgressWriter::stderr(writer.clone())
    });

    ExitCode::from(run(cli, &config, &pg).await)
}

/// Run the selected subcommand and return the process exit code.
///
/// A failure is logged exactly once, right before its exit code is returned.
async fn run(cli: Cli, config: &DeployConfig, pg: &ProgressBar) -> u8 {
    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy(args, config, pg).await.map(drop),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            error!("{err}");
            err.kind().exit_code()
        }
    }
}

use std::{path::Path, time::Duration};

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::warn;

use crate::{
    api::{ApiError, DeployApi, HttpApi},
    archiver::{archive_directory, ArchiverError},
    commands::Deploy,
    config::{DeployConfig, SiteStrategy},
    error::ErrorKind,
    site::{resolve_site, ResolveError},
    submit::{submit_deploy, SubmitError},
};

/// `deploy` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployError {
    /// Deploy path argument is empty.
    #[display(fmt = "deploy path is empty, pass a build directory or omit the argument")]
    #[from(ignore)]
    EmptyPath,

    /// Unable to set up the HTTP client.
    #[display(fmt = "unable to create HTTP client: {}", _0)]
    Client(ApiError),

    /// Site identifier resolution error.
    #[display(fmt = "unable to resolve the site ID: {}", _0)]
    Resolve(ResolveError),

    /// Zip archiver error.
    #[display(fmt = "unable to create zip archive: {}", _0)]
    Archiver(ArchiverError),

    /// Deploy submission error.
    #[display(fmt = "unable to deploy: {}", _0)]
    Submit(SubmitError),
}

impl DeployError {
    /// Failure class of this error.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            DeployError::EmptyPath => ErrorKind::Precondition,
            DeployError::Client(error) => error.kind(),
            DeployError::Resolve(error) => error.kind(),
            DeployError::Archiver(error) => error.kind(),
            DeployError::Submit(error) => error.kind(),
        }
    }
}

/// Deploy flow entrypoint.
///
/// Stage progress is reported with the provided spinner `pg`.
/// Returns the identifier of the created deploy.
pub(crate) async fn deploy(
    Deploy { path }: Deploy,
    config: &DeployConfig,
    pg: &ProgressBar,
) -> Result<String, DeployError> {
    if path.as_os_str().is_empty() {
        return Err(DeployError::EmptyPath);
    }

    let api = HttpApi::new(config)?;

    match run(&path, config, &api, pg).await {
        Ok(deploy_id) => {
            pg.finish_with_message("Deployment initiated.");

            println!("Deployment initiated. Deploy ID: {deploy_id}");
            println!("You can monitor the deployment status in the Netlify dashboard.");

            Ok(deploy_id)
        }
        Err(error) => {
            pg.finish_and_clear();
            Err(error)
        }
    }
}

/// Resolve the site, archive the `path` directory and upload it.
async fn run(
    path: &Path,
    config: &DeployConfig,
    api: &dyn DeployApi,
    pg: &ProgressBar,
) -> Result<String, DeployError> {
    pg.enable_steady_tick(Duration::from_millis(150));
    pg.set_message("Resolving site...");

    let site_id = resolve_site(config, api).await?;

    pg.set_message("Archiving...");

    let archive = archive_directory(path, &config.archive_path)
        .await
        .map_err(|error| created_site_orphaned(config, &site_id, error))?;

    pg.set_message("Uploading archive...");

    let deploy_id = submit_deploy(config, api, &site_id, &archive)
        .await
        .map_err(|error| created_site_orphaned(config, &site_id, error))?;

    Ok(deploy_id)
}

/// Let the user know about a site that was created by this run but never received a deploy.
fn created_site_orphaned<E: Into<DeployError>>(
    config: &DeployConfig,
    site_id: &str,
    error: E,
) -> DeployError {
    if config.site_strategy == SiteStrategy::Create {
        warn!(site_id, "site was created, but no deploy was made to it");
    }

    error.into()
}

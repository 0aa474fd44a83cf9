use std::path::Path;

use derive_more::{Display, Error, From};
use tracing::info;

use crate::{
    api::{ApiError, DeployApi},
    config::DeployConfig,
    error::ErrorKind,
};

/// Deploy submission errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum SubmitError {
    /// API token was not configured.
    #[display(fmt = "API token is missing, provide NETLIFY_API_TOKEN in the environment or the .env file")]
    #[from(ignore)]
    MissingCredential,

    /// Remote API error.
    #[display(fmt = "unable to upload the archive: {}", _0)]
    Api(ApiError),
}

impl SubmitError {
    /// Failure class of this error.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::MissingCredential => ErrorKind::Precondition,
            SubmitError::Api(error) => error.kind(),
        }
    }
}

/// Upload the `archive` as a new deploy of the `site_id` site.
///
/// Returns the identifier of the created deploy.
pub(crate) async fn submit_deploy(
    config: &DeployConfig,
    api: &dyn DeployApi,
    site_id: &str,
    archive: &Path,
) -> Result<String, SubmitError> {
    let credential = config
        .credential()
        .ok_or(SubmitError::MissingCredential)?;

    info!(site_id, archive = %archive.display(), "uploading archive");

    let deploy_id = api.create_deploy(credential, site_id, archive).await?;

    info!(%deploy_id, "deploy created");

    Ok(deploy_id)
}

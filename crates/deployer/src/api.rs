use std::{fmt, io, path::Path};

use async_trait::async_trait;
use derive_more::{Display, Error, From};
use reqwest::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    Client,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::{config::DeployConfig, error::ErrorKind};

/// Remote API errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ApiError {
    /// HTTP client error, including non-success response statuses.
    Http(reqwest::Error),

    /// Unable to read the archive file.
    Io(io::Error),

    /// Response body lacks the expected identifier field.
    #[display(fmt = "response is missing the `{}` field", _0)]
    MissingField(#[error(not(source))] &'static str),
}

impl ApiError {
    /// Failure class of this error.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Http(_) | ApiError::MissingField(_) => ErrorKind::Transport,
            ApiError::Io(_) => ErrorKind::LocalIo,
        }
    }
}

/// Static bearer token used to authenticate API requests.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub(crate) struct Credential(String);

impl Credential {
    /// Wrap a raw token value.
    pub fn new<T: Into<String>>(token: T) -> Self {
        Self(token.into())
    }

    /// Raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the token value is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Remote site, as returned by the site listing and creation endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct Site {
    /// Site identifier.
    #[serde(default)]
    site_id: Option<String>,

    /// Resource identifier, used when `site_id` is absent.
    #[serde(default)]
    id: Option<String>,
}

impl Site {
    /// Take the site identifier out of the response object.
    pub fn into_identifier(self) -> Result<String, ApiError> {
        self.site_id
            .or(self.id)
            .ok_or(ApiError::MissingField("site_id"))
    }
}

/// Deployment API endpoints used by the `deploy` command.
///
/// Every method takes the [`Credential`] explicitly, so that callers have to
/// check its presence before any request can be issued.
#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait DeployApi: Send + Sync {
    /// List sites available to the authenticated account.
    async fn list_sites(&self, credential: &Credential) -> Result<Vec<Site>, ApiError>;

    /// Create a new site with default settings.
    async fn create_site(&self, credential: &Credential) -> Result<Site, ApiError>;

    /// Upload a ZIP archive as a new deploy of the provided site.
    ///
    /// Returns the identifier of the created deploy.
    async fn create_deploy(
        &self,
        credential: &Credential,
        site_id: &str,
        archive: &Path,
    ) -> Result<String, ApiError>;
}

/// [`DeployApi`] implementation over HTTP.
pub(crate) struct HttpApi {
    /// Shared HTTP client.
    client: Client,

    /// API base URL without the trailing slash.
    base_url: String,
}

impl HttpApi {
    /// Create new HTTP API client from the provided configuration.
    pub fn new(config: &DeployConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();

        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl DeployApi for HttpApi {
    async fn list_sites(&self, credential: &Credential) -> Result<Vec<Site>, ApiError> {
        debug!("listing sites");

        Ok(self
            .client
            .get(format!("{}/sites", self.base_url))
            .bearer_auth(credential.as_str())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn create_site(&self, credential: &Credential) -> Result<Site, ApiError> {
        debug!("creating site");

        Ok(self
            .client
            .post(format!("{}/sites", self.base_url))
            .bearer_auth(credential.as_str())
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn create_deploy(
        &self,
        credential: &Credential,
        site_id: &str,
        archive: &Path,
    ) -> Result<String, ApiError> {
        let file = tokio::fs::File::open(archive).await?;
        let length = file.metadata().await?.len();

        debug!(site_id, length, "uploading archive");

        let record: Value = self
            .client
            .post(format!("{}/sites/{site_id}/deploys", self.base_url))
            .bearer_auth(credential.as_str())
            .header(CONTENT_TYPE, "application/zip")
            .header(CONTENT_LENGTH, length)
            .body(file)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(%record, "deploy record received");

        record
            .get("id")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or(ApiError::MissingField("id"))
    }
}

use std::io;

use derive_more::{Display, Error, From};
use tracing::{info, warn};

use crate::{
    api::{ApiError, Credential, DeployApi},
    config::{DeployConfig, SiteStrategy, SITE_ID_KEY},
    error::ErrorKind,
};

/// Site identifier resolution errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ResolveError {
    /// API token was not configured.
    #[display(fmt = "API token is missing, provide NETLIFY_API_TOKEN in the environment or the .env file")]
    #[from(ignore)]
    MissingCredential,

    /// Account has no sites to deploy to.
    #[display(fmt = "no sites found, make sure the site has been deployed before")]
    #[from(ignore)]
    NoSites,

    /// Remote API error.
    #[display(fmt = "unable to query the deployment API: {}", _0)]
    Api(ApiError),

    /// Unable to save a discovered site identifier.
    #[display(fmt = "unable to save the site ID: {}", _0)]
    Persist(io::Error),
}

impl ResolveError {
    /// Failure class of this error.
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::MissingCredential => ErrorKind::Precondition,
            ResolveError::NoSites => ErrorKind::Resolution,
            ResolveError::Api(error) => error.kind(),
            ResolveError::Persist(_) => ErrorKind::LocalIo,
        }
    }
}

/// Obtain the identifier of the site to deploy to.
///
/// The credential is checked before anything else, so no request is ever issued without it.
/// See [`SiteStrategy`] for how the identifier is obtained afterwards.
pub(crate) async fn resolve_site(
    config: &DeployConfig,
    api: &dyn DeployApi,
) -> Result<String, ResolveError> {
    let credential = config
        .credential()
        .ok_or(ResolveError::MissingCredential)?;

    match config.site_strategy {
        SiteStrategy::Lookup => lookup_site(config, api, credential).await,
        SiteStrategy::Create => create_site(config, api, credential).await,
    }
}

/// Reuse the configured site, falling back to the first site of the account.
///
/// A site discovered remotely is saved into the env file.
async fn lookup_site(
    config: &DeployConfig,
    api: &dyn DeployApi,
    credential: &Credential,
) -> Result<String, ResolveError> {
    if let Some(site_id) = config.cached_site_id() {
        info!(site_id, "using existing site ID from configuration");
        return Ok(site_id.to_owned());
    }

    info!("retrieving the existing site ID");

    let site = api
        .list_sites(credential)
        .await?
        .into_iter()
        .next()
        .ok_or(ResolveError::NoSites)?;

    let site_id = site.into_identifier()?;

    info!(%site_id, "existing site ID retrieved");

    config
        .persist_site_id(&site_id)
        .map_err(ResolveError::Persist)?;

    info!(env_file = %config.env_file.display(), "site ID saved as {SITE_ID_KEY}");

    Ok(site_id)
}

/// Create a brand new site.
async fn create_site(
    config: &DeployConfig,
    api: &dyn DeployApi,
    credential: &Credential,
) -> Result<String, ResolveError> {
    if let Some(site_id) = config.cached_site_id() {
        warn!(site_id, "ignoring configured site ID, a new site will be created");
    }

    info!("creating a new site");

    let site_id = api.create_site(credential).await?.into_identifier()?;

    info!(
        %site_id,
        "site created, set {SITE_ID_KEY} and NETLIFY_SITE_STRATEGY=lookup to deploy to it again"
    );

    Ok(site_id)
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use serde_json::json;

    use super::{resolve_site, ResolveError};
    use crate::{
        api::{ApiError, MockDeployApi, Site},
        config::{DeployConfig, SiteStrategy},
        error::ErrorKind,
    };

    fn site(value: serde_json::Value) -> Site {
        serde_json::from_value(value).expect("invalid site object")
    }

    fn no_calls() -> MockDeployApi {
        let mut api = MockDeployApi::new();
        api.expect_list_sites().never();
        api.expect_create_site().never();
        api.expect_create_deploy().never();
        api
    }

    #[tokio::test]
    async fn missing_credential() {
        let dir = tempfile::tempdir().unwrap();

        for strategy in [SiteStrategy::Lookup, SiteStrategy::Create] {
            let mut config = DeployConfig::for_tests("http://localhost", dir.path());
            config.api_token = None;
            config.site_id = Some(String::from("site_cached"));
            config.site_strategy = strategy;

            let error = resolve_site(&config, &no_calls()).await.unwrap_err();

            assert!(matches!(error, ResolveError::MissingCredential));
            assert_eq!(error.kind(), ErrorKind::Precondition);
        }
    }

    #[tokio::test]
    async fn cached_site_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::for_tests("http://localhost", dir.path());
        config.site_id = Some(String::from("site_cached"));

        let site_id = resolve_site(&config, &no_calls()).await.unwrap();

        assert_eq!(site_id, "site_cached");
        assert!(!config.env_file.exists());
    }

    #[tokio::test]
    async fn first_listed_site_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeployConfig::for_tests("http://localhost", dir.path());

        let mut api = MockDeployApi::new();
        api.expect_list_sites().times(1).returning(|_| {
            Ok(vec![
                site(json!({ "site_id": "site_123" })),
                site(json!({ "site_id": "site_456" })),
            ])
        });
        api.expect_create_site().never();

        let site_id = resolve_site(&config, &api).await.unwrap();

        assert_eq!(site_id, "site_123");
        assert_eq!(
            fs::read_to_string(&config.env_file).unwrap(),
            "\nNETLIFY_SITE_ID=site_123"
        );
    }

    #[tokio::test]
    async fn empty_site_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeployConfig::for_tests("http://localhost", dir.path());

        let mut api = MockDeployApi::new();
        api.expect_list_sites().times(1).returning(|_| Ok(Vec::new()));
        api.expect_create_site().never();
        api.expect_create_deploy().never();

        let error = resolve_site(&config, &api).await.unwrap_err();

        assert!(matches!(error, ResolveError::NoSites));
        assert_eq!(error.kind(), ErrorKind::Resolution);
        assert!(!config.env_file.exists());
    }

    #[tokio::test]
    async fn listed_site_without_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeployConfig::for_tests("http://localhost", dir.path());

        let mut api = MockDeployApi::new();
        api.expect_list_sites()
            .returning(|_| Ok(vec![site(json!({ "name": "docs" }))]));

        let error = resolve_site(&config, &api).await.unwrap_err();

        assert!(matches!(
            error,
            ResolveError::Api(ApiError::MissingField("site_id"))
        ));
        assert_eq!(error.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn unwritable_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::for_tests("http://localhost", dir.path());
        config.env_file = dir.path().join("missing").join(".env");

        let mut api = MockDeployApi::new();
        api.expect_list_sites()
            .returning(|_| Ok(vec![site(json!({ "site_id": "site_123" }))]));

        let error = resolve_site(&config, &api).await.unwrap_err();

        assert!(matches!(error, ResolveError::Persist(_)));
        assert_eq!(error.kind(), ErrorKind::LocalIo);
    }

    #[tokio::test]
    async fn creation_on_every_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeployConfig::for_tests("http://localhost", dir.path());
        config.site_strategy = SiteStrategy::Create;
        config.site_id = Some(String::from("site_cached"));

        let created = AtomicUsize::new(0);
        let mut api = MockDeployApi::new();
        api.expect_list_sites().never();
        api.expect_create_site().times(2).returning(move |_| {
            let count = created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(site(json!({ "id": format!("site_new_{count}") })))
        });

        assert_eq!(resolve_site(&config, &api).await.unwrap(), "site_new_1");
        assert_eq!(resolve_site(&config, &api).await.unwrap(), "site_new_2");
        assert!(!config.env_file.exists());
    }

    #[tokio::test]
    async fn api_errors_are_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeployConfig::for_tests("http://localhost", dir.path());

        let mut api = MockDeployApi::new();
        api.expect_list_sites()
            .times(1)
            .returning(|_| Err(ApiError::MissingField("site_id")));

        let error = resolve_site(&config, &api).await.unwrap_err();

        assert!(matches!(error, ResolveError::Api(_)));
    }
}

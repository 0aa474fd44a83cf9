use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use common::config::Logging;
use derive_more::{Display, Error, From};
use serde::Deserialize;

use crate::api::Credential;

/// Optional configuration file, looked up in the working directory.
const CONFIG_FILE: &str = "Deploy.toml";

/// Prefix of every environment variable read by the configuration.
const ENV_PREFIX: &str = "NETLIFY_";

/// Env file key used to save a discovered site identifier.
pub(crate) const SITE_ID_KEY: &str = "NETLIFY_SITE_ID";

/// Configuration loading errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ConfigError {
    /// Unable to load the configuration using [`figment`].
    Figment(figment::Error),

    /// Env file exists but cannot be parsed.
    #[display(fmt = "unable to load env file: {}", _0)]
    EnvFile(dotenvy::Error),
}

/// Site identifier resolution strategy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SiteStrategy {
    /// Reuse the configured site, or the first site of the account.
    #[default]
    Lookup,

    /// Create a new site on every deploy.
    Create,
}

/// Deployment configuration.
///
/// Built once at startup and passed by reference into every component.
#[derive(Debug, Deserialize)]
pub(crate) struct DeployConfig {
    /// API bearer token.
    #[serde(default)]
    pub api_token: Option<Credential>,

    /// Previously resolved site identifier.
    #[serde(default)]
    pub site_id: Option<String>,

    /// How to obtain a site identifier.
    #[serde(default)]
    pub site_strategy: SiteStrategy,

    /// Deployment API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Location of the archive built before upload. Overwritten on every run.
    #[serde(default = "default_archive_path")]
    pub archive_path: PathBuf,

    /// Env file which is loaded on startup and receives discovered site identifiers.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Timeout for a single API request, in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: Logging,
}

/// Production deployment API base URL.
fn default_api_url() -> String {
    String::from("https://api.netlify.com/api/v1")
}

/// Archive is placed into the working directory.
fn default_archive_path() -> PathBuf {
    PathBuf::from("deploy.zip")
}

/// Env file is looked up in the working directory.
fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

impl DeployConfig {
    /// Create new config using the env file, `Deploy.toml` and environment variables.
    ///
    /// Variables from the env file never override the ones already present in the process
    /// environment. See [`Env`] for more details on how to use environment variables configuration.
    ///
    /// [`Env`]: figment::providers::Env
    pub fn new() -> Result<Self, ConfigError> {
        let env_file = common::config::layered(CONFIG_FILE, ENV_PREFIX)
            .extract_inner::<PathBuf>("env_file")
            .unwrap_or_else(|_| default_env_file());

        load_env_file(&env_file)?;

        // Providers are evaluated eagerly, so the figment is rebuilt after the env file is loaded.
        Ok(common::config::layered(CONFIG_FILE, ENV_PREFIX).extract()?)
    }

    /// Get the API credential, if a non-empty one is configured.
    pub fn credential(&self) -> Option<&Credential> {
        self.api_token.as_ref().filter(|token| !token.is_empty())
    }

    /// Get the previously resolved site identifier, if a non-empty one is configured.
    pub fn cached_site_id(&self) -> Option<&str> {
        self.site_id.as_deref().filter(|site_id| !site_id.is_empty())
    }

    /// Get the configured API request timeout.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_secs)
    }

    /// Save the site identifier into the env file, so that the next run can reuse it.
    ///
    /// Existing `NETLIFY_SITE_ID` assignments are replaced in place, since the env file loader
    /// only honors the first one. Without any, a new line is appended.
    pub fn persist_site_id(&self, site_id: &str) -> Result<(), io::Error> {
        let contents = match fs::read_to_string(&self.env_file) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
            Err(error) => return Err(error),
        };

        let mut replaced = false;
        let mut lines: Vec<String> = contents
            .split('\n')
            .map(|line| {
                if !assigns_site_id(line) {
                    return line.to_owned();
                }

                replaced = true;

                let ending = if line.ends_with('\r') { "\r" } else { "" };
                format!("{SITE_ID_KEY}={site_id}{ending}")
            })
            .collect();

        if !replaced {
            lines.push(format!("{SITE_ID_KEY}={site_id}"));
        }

        let mut file = File::create(&self.env_file)?;
        file.write_all(lines.join("\n").as_bytes())?;
        file.sync_all()
    }

    /// Create new config suitable for running unit tests.
    ///
    /// All local files are placed inside of the provided `dir`.
    #[cfg(test)]
    pub fn for_tests(api_url: &str, dir: &Path) -> Self {
        Self {
            api_token: Some(Credential::new("tok_abc")),
            site_id: None,
            site_strategy: SiteStrategy::Lookup,
            api_url: api_url.to_owned(),
            archive_path: dir.join("deploy.zip"),
            env_file: dir.join(".env"),
            request_timeout: Some(5),
            logging: Logging::default(),
        }
    }
}

/// Check whether the env file `line` assigns the site identifier.
fn assigns_site_id(line: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();

    line.strip_prefix(SITE_ID_KEY)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// Load the env file into the process environment, ignoring it if missing.
fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    match dotenvy::from_path(path) {
        Err(error) if error.not_found() => Ok(()),
        result => Ok(result?),
    }
}

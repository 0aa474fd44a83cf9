use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[cfg(feature = "logging")]
use tracing_subscriber::filter::LevelFilter;

/// Create a [`Figment`] that reads the provided TOML file, overridden by prefixed environment variables.
///
/// Nested keys are separated with a double underscore, so `PREFIX_LOGGING__LEVEL`
/// maps onto the `logging.level` key. A missing TOML file is not an error.
pub fn layered<P: AsRef<Path>>(file: P, env_prefix: &str) -> Figment {
    Figment::new()
        .merge(Toml::file(file.as_ref()))
        .merge(Env::prefixed(env_prefix).split("__"))
}

/// Implementation of [`serde`]'s deserializer for [`FromStr`] types.
///
/// [`FromStr`]: std::str::FromStr
pub fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
}

/// Logging configuration.
#[cfg(feature = "logging")]
#[derive(Debug, Deserialize)]
pub struct Logging {
    /// Log level.
    #[serde(deserialize_with = "deserialize_from_str")]
    pub level: LevelFilter,
}

#[cfg(feature = "logging")]
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
        }
    }
}

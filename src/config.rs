//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::softlayer::DEFAULT_API_HOST;

/// Environment variables read by [`SoftlayerConfig`].
pub const CONFIG_ENV_VARS: [&str; 7] = [
    "SOFTLAYER_USERNAME",
    "SOFTLAYER_API_KEY",
    "SOFTLAYER_API_HOST",
    "SOFTLAYER_TEMPLATE_DIR",
    "SOFTLAYER_POLL_INTERVAL_SECS",
    "SOFTLAYER_READY_TIMEOUT_SECS",
    "SOFTLAYER_REQUEST_TIMEOUT_SECS",
];

/// `SoftLayer` specific configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "SOFTLAYER")]
pub struct SoftlayerConfig {
    /// API user name. This value is required.
    pub username: String,
    /// API key paired with the user name. This value is required.
    pub api_key: String,
    /// Host and path prefix of the REST endpoint.
    #[ortho_config(default = DEFAULT_API_HOST.to_owned())]
    pub api_host: String,
    /// Directory holding request-body templates. The built-in templates are
    /// used when unset.
    pub template_dir: Option<String>,
    /// Seconds between readiness checks.
    #[ortho_config(default = 3)]
    pub poll_interval_secs: u64,
    /// Seconds to wait for a new instance to become ready.
    #[ortho_config(default = 600)]
    pub ready_timeout_secs: u64,
    /// Per-request HTTP timeout in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl SoftlayerConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to the configuration file",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    fn require_positive(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero: check {} or {}",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("softlayer-builder")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Delay between readiness checks.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Budget for an instance to become ready.
    #[must_use]
    pub const fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when a duration is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.username,
            &FieldMetadata::new("SoftLayer API user name", "SOFTLAYER_USERNAME", "username"),
        )?;
        Self::require_field(
            &self.api_key,
            &FieldMetadata::new("SoftLayer API key", "SOFTLAYER_API_KEY", "api_key"),
        )?;
        Self::require_field(
            &self.api_host,
            &FieldMetadata::new("API host", "SOFTLAYER_API_HOST", "api_host"),
        )?;
        Self::require_positive(
            self.poll_interval_secs,
            &FieldMetadata::new(
                "poll interval",
                "SOFTLAYER_POLL_INTERVAL_SECS",
                "poll_interval_secs",
            ),
        )?;
        Self::require_positive(
            self.ready_timeout_secs,
            &FieldMetadata::new(
                "ready timeout",
                "SOFTLAYER_READY_TIMEOUT_SECS",
                "ready_timeout_secs",
            ),
        )?;
        Self::require_positive(
            self.request_timeout_secs,
            &FieldMetadata::new(
                "request timeout",
                "SOFTLAYER_REQUEST_TIMEOUT_SECS",
                "request_timeout_secs",
            ),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds an unusable value.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

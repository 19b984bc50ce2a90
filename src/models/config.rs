//! Configuration model loaded from external sources.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::credential::{CredentialSources, DEFAULT_TOKEN_FILE, HUB_TOKEN_ENV};
use crate::encoders::local::MODEL_CATALOG;
use crate::processing::verify::RunPolicy;

/// Prefix of environment overrides, e.g. `VERIFIER__FAIL_FAST=true`.
pub const ENV_PREFIX: &str = "VERIFIER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
    #[error("no models configured")]
    NoModels,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
/// Settings for a verification run.
pub struct VerifierConfig {
    pub models: Vec<String>,
    pub token_file: PathBuf,
    pub token_env: String,
    /// Last-resort token; unset means the run proceeds anonymously.
    pub credential_fallback: Option<String>,
    pub cache_dir: PathBuf,
    /// Hub mirror; the public hub when unset.
    pub hub_endpoint: Option<String>,
    pub fail_fast: bool,
    pub request_timeout_secs: u64,
    /// JSON file replacing the built-in captioned images.
    pub sample_set: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            models: MODEL_CATALOG.iter().map(|entry| entry.id.to_string()).collect(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            token_env: HUB_TOKEN_ENV.to_string(),
            credential_fallback: None,
            cache_dir: PathBuf::from(".fastembed_cache"),
            hub_endpoint: None,
            fail_fast: false,
            request_timeout_secs: 30,
            sample_set: None,
            show_download_progress: true,
        }
    }
}

impl VerifierConfig {
    /// Loads `config_file` (any supported extension, optional) and applies
    /// `VERIFIER__*` environment overrides on top.
    pub fn load(config_file: &str) -> Result<Self, ConfigError> {
        Self::from_sources(config_file, environment())
    }

    fn from_sources(
        config_file: &str,
        env: config::Environment,
    ) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_file).required(false))
            .add_source(env)
            .build()?;
        let config: VerifierConfig = settings.try_deserialize()?;
        if config.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        Ok(config)
    }

    pub fn credential_sources(&self) -> CredentialSources {
        CredentialSources {
            token_file: self.token_file.clone(),
            env_var: self.token_env.clone(),
            fallback: self.credential_fallback.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_policy(&self) -> RunPolicy {
        if self.fail_fast {
            RunPolicy::FailFast
        } else {
            RunPolicy::ContinueOnError
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("models")
}

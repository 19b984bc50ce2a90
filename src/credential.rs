//! Resolution of the optional model-hub access token.
//!
//! Sources are checked in a fixed order: a dotfile in the working directory,
//! an environment variable, then a configured fallback. Resolution never
//! fails; when nothing is configured the run proceeds anonymously.

use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable checked after the token file.
pub const HUB_TOKEN_ENV: &str = "HF_TOKEN";

/// Dotfile checked before any environment variable.
pub const DEFAULT_TOKEN_FILE: &str = ".hf_token";

/// Where a resolved token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    File,
    Environment,
    Fallback,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::File => write!(f, "token file"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Fallback => write!(f, "configured fallback"),
        }
    }
}

/// An access token for the model hub.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    source: CredentialSource,
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Sources consulted by [`resolve_credential`].
#[derive(Clone, Debug)]
pub struct CredentialSources {
    pub token_file: PathBuf,
    pub env_var: String,
    pub fallback: Option<String>,
}

impl Default for CredentialSources {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            env_var: HUB_TOKEN_ENV.to_string(),
            fallback: None,
        }
    }
}

/// Resolves the token from the process environment.
pub fn resolve_credential(sources: &CredentialSources) -> Option<Credential> {
    resolve_with(sources, |name| std::env::var(name).ok())
}

/// Resolves the token using `lookup_env` in place of the process environment.
pub fn resolve_with<F>(sources: &CredentialSources, lookup_env: F) -> Option<Credential>
where
    F: Fn(&str) -> Option<String>,
{
    let resolved = read_token_file(&sources.token_file)
        .map(|token| (token, CredentialSource::File))
        .or_else(|| {
            non_empty(lookup_env(&sources.env_var))
                .map(|token| (token, CredentialSource::Environment))
        })
        .or_else(|| {
            non_empty(sources.fallback.clone()).map(|token| (token, CredentialSource::Fallback))
        });

    match resolved {
        Some((token, source)) => {
            log::info!("Using model hub credential from {source}");
            Some(Credential { token, source })
        }
        None => {
            log::info!("No model hub credential configured, continuing anonymously");
            None
        }
    }
}

fn read_token_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    non_empty(Some(contents))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

//! Server configuration: optional TOML file plus environment overrides.
//!
//! ```toml
//! [server]
//! port = 8080
//! rate_limit = 60
//!
//! [lifecycle]
//! max_transition_attempts = 3
//!
//! [[principals]]
//! id = "alice"
//! token = "alice-secret"
//! ```
//!
//! Environment:
//! - `ACTLOG_RATE_LIMIT` -- requests per minute per IP
//! - `ACTLOG_TOKENS` -- `id=token` pairs separated by commas, appended to
//!   the file's principals

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use actlog_core::Principal;
use actlog_service::LifecycleConfig;

/// Default port when neither the CLI nor the config file sets one.
pub(crate) const DEFAULT_PORT: u16 = 8080;

/// Default rate limit: 60 requests per minute per IP.
pub(crate) const DEFAULT_RATE_LIMIT: u64 = 60;

/// Maximum request body size: 1 MB.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("error reading config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("no principals configured; add [[principals]] to the config file or set ACTLOG_TOKENS")]
    NoPrincipals,

    #[error("invalid principal entry: {0}")]
    InvalidPrincipal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub(crate) port: Option<u16>,
    pub(crate) rate_limit: u64,
    pub(crate) max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// A principal and the bearer token that authenticates as it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct PrincipalEntry {
    pub(crate) id: String,
    pub(crate) token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) server: ServerConfig,
    pub(crate) lifecycle: LifecycleConfig,
    pub(crate) principals: Vec<PrincipalEntry>,
}

impl AppConfig {
    /// Load from `path` if given, apply environment overrides, and validate.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `ACTLOG_*` overrides read through `lookup`.
    pub(crate) fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup("ACTLOG_RATE_LIMIT").filter(|v| !v.is_empty()) {
            self.server.rate_limit = raw.parse().map_err(|_| ConfigError::Env {
                var: "ACTLOG_RATE_LIMIT",
                message: format!("'{}' is not a non-negative integer", raw),
            })?;
        }

        if let Some(raw) = lookup("ACTLOG_TOKENS").filter(|v| !v.is_empty()) {
            for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (id, token) = pair.split_once('=').ok_or_else(|| ConfigError::Env {
                    var: "ACTLOG_TOKENS",
                    message: format!("expected id=token, got '{}'", pair),
                })?;
                self.principals.push(PrincipalEntry {
                    id: id.trim().to_string(),
                    token: token.trim().to_string(),
                });
            }
        }

        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.principals.is_empty() {
            return Err(ConfigError::NoPrincipals);
        }
        let mut tokens = HashSet::new();
        for entry in &self.principals {
            if entry.id.is_empty() {
                return Err(ConfigError::InvalidPrincipal(
                    "principal id must not be empty".to_string(),
                ));
            }
            if entry.token.is_empty() {
                return Err(ConfigError::InvalidPrincipal(format!(
                    "principal '{}' has an empty token",
                    entry.id
                )));
            }
            if !tokens.insert(entry.token.as_str()) {
                return Err(ConfigError::InvalidPrincipal(format!(
                    "token for principal '{}' is already assigned",
                    entry.id
                )));
            }
        }
        Ok(())
    }

    /// Token -> principal lookup table for the auth middleware.
    pub(crate) fn token_table(&self) -> HashMap<String, Principal> {
        self.principals
            .iter()
            .map(|e| (e.token.clone(), Principal::new(e.id.clone())))
            .collect()
    }
}

//! Client configuration.
//!
//! Loaded from an optional YAML file. `${VAR}` and `${VAR:-default}` are
//! expanded from the environment before parsing; `$$` is a literal `$`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::endpoint::{DEFAULT_API_PREFIX, DEFAULT_BACKEND_PORT, EndpointRegistry, Origin};
use crate::retry::{DEFAULT_RETRY_DELAYS_MS, RetryPolicy};
use crate::session::FileSessionPersistence;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mentor.yaml";
/// Environment variable that overrides `api_base_url`.
pub const BASE_URL_ENV: &str = "MENTOR_API_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,

    #[error("invalid origin '{value}': {reason}")]
    InvalidOrigin { value: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] crate::transport::TransportError),
}

// ============================================================================
// ClientConfig
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Explicit primary base address, e.g. `http://localhost:8000/api/v1`.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Where the app is served from, e.g. `http://app.local:3000`.
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_retry_delays")]
    pub retry_delays_ms: Vec<u64>,
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_backend_port() -> u16 {
    DEFAULT_BACKEND_PORT
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

fn default_retry_delays() -> Vec<u64> {
    DEFAULT_RETRY_DELAYS_MS.to_vec()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            origin: None,
            backend_port: default_backend_port(),
            api_prefix: default_api_prefix(),
            retry_delays_ms: default_retry_delays(),
            session_file: None,
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Load the file at `path`, falling back to defaults when it does not
    /// exist, then apply the environment override.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config: Self = match fs::read_to_string(path).await {
            Ok(contents) => serde_saphyr::from_str(&expand_env_vars(&contents)?)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if let Ok(base) = std::env::var(BASE_URL_ENV) {
            config.api_base_url = Some(base);
        }
        Ok(config)
    }

    /// The base address override, with blank values treated as absent.
    pub fn base_override(&self) -> Option<String> {
        self.api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .map(str::to_string)
    }

    pub fn parsed_origin(&self) -> Result<Option<Origin>, ConfigError> {
        let Some(value) = self.origin.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        Origin::parse(value)
            .map(Some)
            .map_err(|e| ConfigError::InvalidOrigin {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn endpoint_registry(&self) -> Result<EndpointRegistry, ConfigError> {
        Ok(EndpointRegistry::with_layout(
            self.base_override(),
            self.parsed_origin()?,
            self.backend_port,
            &self.api_prefix,
        ))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(&self.retry_delays_ms)
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(FileSessionPersistence::default_path)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Environment expansion
// ============================================================================

fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(reference) = after.strip_prefix('{') {
            let end = reference
                .find('}')
                .ok_or(ConfigError::UnclosedVarReference)?;
            out.push_str(&resolve_var(&reference[..end])?);
            rest = &reference[end + 1..];
        } else {
            out.push('$');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Resolve `NAME` or `NAME:-default`.
fn resolve_var(reference: &str) -> Result<String, ConfigError> {
    let (name, default) = match reference.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (reference, None),
    };

    match (std::env::var(name), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_string()),
        (Err(_), None) => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u64 = 1000;

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const AUTH_TOKEN_ENV: &str = "ANTHROPIC_AUTH_TOKEN";
const BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";

/// Resolved credential for the `Messages` endpoint.
///
/// An API key is sent as `x-api-key`; an auth token is sent as
/// `Authorization: Bearer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    AuthToken(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Falls back to the `ANTHROPIC_API_KEY` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Falls back to the `ANTHROPIC_AUTH_TOKEN` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Falls back to `ANTHROPIC_BASE_URL`, then the public API endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Value of the `anthropic-version` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Optional `anthropic-beta` header. For multiple betas, pass a
    /// comma-separated list without spaces, e.g. `beta1,beta2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<String>,
    /// Used when a request does not specify `max_tokens` (the provider
    /// requires it). Defaults to 1000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u64>,
    /// Request timeout in seconds. Defaults to 300.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the credential from the config or the environment.
    ///
    /// # Errors
    /// Returns a `Config` error when neither an API key nor an auth token
    /// is available; callers check this before any network activity.
    pub fn resolve_credential(&self) -> Result<Credential> {
        if let Some(ref key) = self.api_key {
            return Ok(Credential::ApiKey(key.clone()));
        }
        if let Some(ref token) = self.auth_token {
            return Ok(Credential::AuthToken(token.clone()));
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                return Ok(Credential::ApiKey(key));
            }
        }
        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            if !token.is_empty() {
                return Ok(Credential::AuthToken(token));
            }
        }
        Err(ClientError::config(format!(
            "Missing Anthropic credential. Provide one in the config or set the {API_KEY_ENV} environment variable."
        )))
    }

    /// Resolve the effective base URL (config override, environment, or default).
    pub fn effective_base_url(&self) -> String {
        if let Some(ref url) = self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                return url.trim_end_matches('/').to_string();
            }
        }
        DEFAULT_BASE_URL.to_string()
    }

    pub fn effective_api_version(&self) -> String {
        self.api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
    }

    pub fn effective_max_tokens(&self) -> u64 {
        self.default_max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn effective_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(300))
    }
}

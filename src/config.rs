//! Application configuration.
//!
//! Settings come from built-in defaults, then the environment, then CLI
//! flags. Session durations come from the timer's own flags.

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::FileCredentialStore;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default credential renewal endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "POMOTASK_API_URL";

/// Default transport timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The API URL is not an http(s) URL.
    #[error("APIのURLが不正です: {0}")]
    InvalidApiUrl(String),

    /// No location for the credential file could be determined.
    #[error("認証情報の保存先を決定できません。HOME環境変数を確認してください")]
    NoCredentialPath,
}

// ============================================================================
// ApiConfig
// ============================================================================

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,

    /// Path of the credential renewal endpoint.
    pub refresh_path: String,

    /// Transport timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ApiConfig {
    /// Defaults with `POMOTASK_API_URL` applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        config
    }

    /// Returns a configuration pointing at `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(self.base_url.clone()));
        }
        Ok(())
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// Everything the CLI needs to build its API collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub credential_path: PathBuf,
}

impl AppConfig {
    /// Assembles and validates the configuration.
    ///
    /// `credential_path` falls back to the platform default when `None`.
    pub fn new(api: ApiConfig, credential_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        api.validate()?;

        let credential_path = match credential_path {
            Some(path) => path,
            None => FileCredentialStore::default_path().ok_or(ConfigError::NoCredentialPath)?,
        };

        Ok(Self {
            api,
            credential_path,
        })
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-request timeout, matching the backend's auth calls.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_SESSION_PATH: &str = ".pantry/session.json";

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API base URL, without trailing slash
    pub api_base_url: String,
    /// Timeout applied to every backend request
    pub request_timeout: Duration,
    /// Where the session document is persisted
    pub session_path: PathBuf,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_base_url =
            env::var("PANTRY_API_URL").map_err(|_| ConfigError::Missing("PANTRY_API_URL"))?;

        let request_timeout = match env::var("PANTRY_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "PANTRY_REQUEST_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let session_path = env::var("PANTRY_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_PATH));

        Self::default()
            .with_api_base_url(&api_base_url)
            .map(|config| Self {
                request_timeout,
                session_path,
                ..config
            })
    }

    /// Override the API base URL (trailing slashes are stripped).
    pub fn with_api_base_url(self, url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "PANTRY_API_URL",
                value: url.to_string(),
            });
        }
        Ok(Self {
            api_base_url: trimmed.to_string(),
            ..self
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("PANTRY_API_URL", "https://api.example.com/");
        env::set_var("PANTRY_REQUEST_TIMEOUT_SECS", "12");
        env::set_var("PANTRY_SESSION_PATH", "/tmp/pantry-session.json");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert_eq!(
            config.session_path,
            PathBuf::from("/tmp/pantry-session.json")
        );
    }

    #[test]
    fn test_base_url_requires_http_scheme() {
        let err = Config::default()
            .with_api_base_url("api.example.com")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "PANTRY_API_URL",
                ..
            }
        ));
    }

    #[test]
    fn test_default_timeout_is_thirty_seconds() {
        assert_eq!(Config::default().request_timeout, Duration::from_secs(30));
    }
}

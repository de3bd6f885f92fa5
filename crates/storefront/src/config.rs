//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional.
//!
//! - `EBASI_API_BASE_URL` - Backend REST API root (default: `http://127.0.0.1:8000/api/v1`)
//! - `EBASI_API_TIMEOUT_SECS` - Per-request timeout in seconds (default: none)
//! - `EBASI_STORAGE_DIR` - Directory for local snapshots (default: `.ebasi`)
//! - `EBASI_HOST` - Bind address (default: 127.0.0.1)
//! - `EBASI_PORT` - Listen port (default: 3000)
//! - `EBASI_PAGES_DIR` - Static page directory served by the shell (default: `public`)
//! - `EBASI_HIDDEN_ROUTES` - Comma-separated route prefixes to hide (default: built-in list)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::middleware::route_visibility::DEFAULT_HIDDEN_ROUTES;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Backend API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API root. Always ends with `/` so relative endpoints join under it.
    pub base_url: Url,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Directory holding local storage snapshots
    pub storage_dir: PathBuf,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Static pages served by the shell
    pub pages_dir: PathBuf,
    /// Route prefixes redirected to `/`
    pub hidden_routes: Vec<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error event sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            "EBASI_API_BASE_URL",
            &get_env_or_default(&lookup, "EBASI_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let timeout = get_optional_env(&lookup, "EBASI_API_TIMEOUT_SECS")
            .map(|raw| parse_timeout("EBASI_API_TIMEOUT_SECS", &raw))
            .transpose()?;

        let host = get_env_or_default(&lookup, "EBASI_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("EBASI_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default(&lookup, "EBASI_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("EBASI_PORT".to_string(), e.to_string()))?;

        let hidden_routes = match get_optional_env(&lookup, "EBASI_HIDDEN_ROUTES") {
            Some(raw) => parse_route_list(&raw),
            None => DEFAULT_HIDDEN_ROUTES.iter().map(|r| (*r).to_string()).collect(),
        };

        Ok(Self {
            api: ApiConfig { base_url, timeout },
            storage_dir: get_env_or_default(&lookup, "EBASI_STORAGE_DIR", ".ebasi").into(),
            host,
            port,
            pages_dir: get_env_or_default(&lookup, "EBASI_PAGES_DIR", "public").into(),
            hidden_routes,
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_rate(&lookup, "SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parse_rate(&lookup, "SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable, treating empty values as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get a variable with a default value.
fn get_env_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse an http(s) API root and make sure its path ends with `/`.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

fn parse_rate(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f32,
) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(lookup, key) else {
        return Ok(default);
    };
    let rate = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ));
    }
    Ok(rate)
}

/// Split a comma-separated list of route prefixes into normalized paths.
fn parse_route_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|route| route.trim().trim_end_matches('/'))
        .filter(|route| !route.is_empty())
        .map(|route| {
            if route.starts_with('/') {
                route.to_string()
            } else {
                format!("/{route}")
            }
        })
        .collect()
}

//! # Runtime Settings
//!
//! Process-level settings: the transport (origin, credentials, offline cache,
//! timeouts, retry backoff bounds) and the platform facts consumed by providers
//! and components. Settings are read from a JSON5 document whose top-level keys
//! are `viewer`, `transport` and `browser`; every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::configs::config_viewer::ViewerConfig;
use crate::error::ConfigError;
use crate::utils::browser::BrowserInfo;

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportConfig {
    /// Origin of the viewer. Relative asset URLs resolve against it and
    /// requests elsewhere count as cross-origin.
    pub origin: Option<String>,
    /// Whether the standard transport can make credentialed cross-origin requests.
    pub with_credentials: bool,
    /// Default for replaying cached responses when the network is unreachable.
    pub offline: bool,
    /// Directory of the persisted offline cache. In-memory when unset.
    pub offline_cache_dir: Option<PathBuf>,
    /// Per-request timeout. Unset by default: requests end only when the
    /// server answers or the caller aborts.
    pub timeout_secs: Option<u64>,
    /// User agent sent by the standard transport.
    pub user_agent: String,
    /// Shortest wait between fetch retries.
    pub retry_min_interval_ms: u64,
    /// Longest wait between fetch retries.
    pub retry_max_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            origin: None,
            with_credentials: true,
            offline: true,
            offline_cache_dir: None,
            timeout_secs: None,
            user_agent: format!("docview/{}", env!("CARGO_PKG_VERSION")),
            retry_min_interval_ms: 250,
            retry_max_interval_ms: 2_000,
        }
    }
}

impl TransportConfig {
    /// The parsed origin, if one is configured.
    pub fn origin_url(&self) -> Result<Option<Url>, ConfigError> {
        self.origin
            .as_deref()
            .map(|value| {
                Url::parse(value).map_err(|source| ConfigError::Url {
                    value: value.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// The per-request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Backoff bounds between fetch retries, as `(min, max)`.
    pub fn retry_bounds(&self) -> (Duration, Duration) {
        let min = Duration::from_millis(self.retry_min_interval_ms);
        let max = Duration::from_millis(self.retry_max_interval_ms).max(min);
        (min, max)
    }
}

/// Everything needed to bootstrap a framework and its scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocviewSettings {
    /// Configuration of the scope(s) created by the application.
    pub viewer: ViewerConfig,
    /// Transport settings.
    pub transport: TransportConfig,
    /// Platform facts.
    pub browser: BrowserInfo,
}

impl DocviewSettings {
    /// Parses settings from JSON5 text.
    pub fn from_json5_str(text: &str) -> Result<Self, ConfigError> {
        let settings: DocviewSettings = json5::from_str(text)?;
        // Surface a malformed origin at load time rather than on first request.
        settings.transport.origin_url()?;
        Ok(settings)
    }

    /// Reads and parses a JSON5 settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json5_str(&text)?;
        log::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }
}

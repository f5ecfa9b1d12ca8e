//! Client configuration.
//!
//! Provides a `ClientConfig` struct shared by the library and the CLI: the
//! default LAN server, the cloud endpoint, polling interval, per-call timeouts
//! and share retry policy. Every field has a default so an empty JSON object
//! is a valid configuration file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_CLOUD_SYNC_URL: &str = "https://api.npoint.io/8f3e2d1c9b7a6e5f4d3c";
pub const DEFAULT_DISCOVERY_PORT: u16 = 3000;

pub const ENV_SERVER_URL: &str = "QUIZSHARE_SERVER_URL";
pub const ENV_CLOUD_URL: &str = "QUIZSHARE_CLOUD_URL";
pub const ENV_ANALYTICS_URL: &str = "QUIZSHARE_ANALYTICS_URL";

/// Per-call timeouts, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    pub status_ms: u64,
    pub list_ms: u64,
    pub request_ms: u64,
    pub server_info_ms: u64,
    pub probe_ms: u64,
    pub address_probe_ms: u64,
    pub cloud_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            status_ms: 3_000,
            list_ms: 5_000,
            request_ms: 10_000,
            server_info_ms: 5_000,
            probe_ms: 2_000,
            address_probe_ms: 3_000,
            cloud_ms: 10_000,
        }
    }
}

impl Timeouts {
    pub const fn status(&self) -> Duration {
        Duration::from_millis(self.status_ms)
    }

    pub const fn list(&self) -> Duration {
        Duration::from_millis(self.list_ms)
    }

    pub const fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub const fn server_info(&self) -> Duration {
        Duration::from_millis(self.server_info_ms)
    }

    pub const fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub const fn address_probe(&self) -> Duration {
        Duration::from_millis(self.address_probe_ms)
    }

    pub const fn cloud(&self) -> Duration {
        Duration::from_millis(self.cloud_ms)
    }
}

/// Runtime configuration for the sharing client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// LAN server used until one is configured or discovered
    pub server_url: String,
    /// Cloud JSON document endpoint
    pub cloud_sync_url: String,
    /// Optional analytics sink; events are dropped when unset
    pub analytics_url: Option<String>,
    pub sync_interval_secs: u64,
    pub share_max_attempts: u32,
    pub share_retry_delay_ms: u64,
    pub discovery_port: u16,
    /// Filter the offline cache when the server cannot answer a search
    pub offline_search: bool,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            cloud_sync_url: DEFAULT_CLOUD_SYNC_URL.to_string(),
            analytics_url: None,
            sync_interval_secs: 30,
            share_max_attempts: 3,
            share_retry_delay_ms: 2_000,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            offline_search: false,
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config = parse_client_config(&raw)
            .map_err(|error| Error::Config(format!("{}: {error}", path.display())))?;
        Ok(config)
    }

    /// Write configuration as pretty JSON, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply `QUIZSHARE_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(ENV_SERVER_URL)) {
            self.server_url = url;
        }
        if let Some(url) = normalize_text_option(lookup(ENV_CLOUD_URL)) {
            self.cloud_sync_url = url;
        }
        if let Some(url) = normalize_text_option(lookup(ENV_ANALYTICS_URL)) {
            self.analytics_url = Some(url);
        }
        self
    }

    /// Reject values that would make the client misbehave.
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(self.cloud_sync_url.trim()) {
            return Err(Error::Config(
                "cloud_sync_url must include http:// or https://".to_string(),
            ));
        }
        if let Some(url) = &self.analytics_url {
            if !is_http_url(url.trim()) {
                return Err(Error::Config(
                    "analytics_url must include http:// or https://".to_string(),
                ));
            }
        }
        if self.share_max_attempts == 0 {
            return Err(Error::Config(
                "share_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.sync_interval_secs == 0 {
            return Err(Error::Config(
                "sync_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub const fn share_retry_delay(&self) -> Duration {
        Duration::from_millis(self.share_retry_delay_ms)
    }
}

/// Parse a configuration document from raw JSON.
///
/// Public for testability; callers can exercise parsing without touching disk.
pub fn parse_client_config(payload: &str) -> Result<ClientConfig> {
    let config: ClientConfig = serde_json::from_str(payload)?;
    config.validate()?;
    Ok(config)
}

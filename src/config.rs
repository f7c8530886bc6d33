//! Client configuration.
//!
//! Loaded from a JSON file under the platform config directory; every field
//! has a default so a missing or partial file still yields a working client.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub connection: ConnectionConfig,
    pub persistence: PersistenceConfig,
    pub gesture: GestureConfig,
}

/// Endpoint routing: how a page origin maps to the websocket origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Host whose origin routes to the fixed remote API.
    pub production_host: String,
    /// Websocket origin used for the production host.
    pub remote_api_origin: String,
    /// Hosts treated as local development.
    pub local_dev_hosts: Vec<String>,
    /// Port the local backend listens on.
    pub local_dev_port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            production_host: "app.muxgrid.dev".to_string(),
            remote_api_origin: "wss://api.muxgrid.dev".to_string(),
            local_dev_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            local_dev_port: 7681,
        }
    }
}

/// Connection timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Window for the open acknowledgment before a connect attempt times out.
    pub connect_timeout_ms: u64,
    /// Backoff before the single automatic retry.
    pub retry_backoff_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            retry_backoff_ms: 2_000,
        }
    }
}

/// Layout persistence timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Debounce window for geometry saves.
    pub debounce_ms: u64,
    /// Retries after a failed save before giving up.
    pub max_retries: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            max_retries: 3,
        }
    }
}

/// Scroll gesture tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Vertical movement per emitted scroll step.
    pub scroll_threshold_px: f32,
    /// Control sequence sent per upward step.
    pub scroll_up_seq: String,
    /// Control sequence sent per downward step.
    pub scroll_down_seq: String,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            scroll_threshold_px: 40.0,
            scroll_up_seq: "\x1b[A".to_string(),
            scroll_down_seq: "\x1b[B".to_string(),
        }
    }
}

impl Config {
    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<()> {
        let path = config_path().context("no config directory available")?;
        self.save_to(&path)
    }

    /// Save to a specific path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, raw).with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Reject values that would make the client misbehave silently.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.connection.connect_timeout_ms > 0,
            "connect_timeout_ms must be positive"
        );
        anyhow::ensure!(
            self.gesture.scroll_threshold_px > 0.0,
            "scroll_threshold_px must be positive"
        );
        anyhow::ensure!(
            self.endpoint.local_dev_port > 0,
            "local_dev_port must be positive"
        );
        Ok(())
    }
}

/// Platform config file path: `<config-dir>/muxgrid/config.json`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("muxgrid").join("config.json"))
}

//! Configuration for the control client.

use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use panel_common::ServerConfig;
use serde::Deserialize;

/// Main configuration structure for the control client.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    /// Defaults for the start command form.
    #[serde(default)]
    pub server: ServerConfig,
    /// Presentation only; the synchronization core never reads it.
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the control backend (e.g. "http://localhost:8000" or a
    /// reverse-proxied "https://host/api").
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HttpConfig {
    /// Per-request timeout. Unset means wait for the transport.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Poll periods in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_status_interval")]
    pub status_interval_ms: u64,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_ms: u64,
    #[serde(default = "default_logs_interval")]
    pub logs_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: default_status_interval(),
            stats_interval_ms: default_stats_interval(),
            logs_interval_ms: default_logs_interval(),
        }
    }
}

impl PollingConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn logs_interval(&self) -> Duration {
        Duration::from_millis(self.logs_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Cyberpunk,
    Corporate,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub theme: Theme,
}

// Default values
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_status_interval() -> u64 {
    3000
}
fn default_stats_interval() -> u64 {
    5000
}
fn default_logs_interval() -> u64 {
    2000
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (PANEL__SECTION__KEY format)
    /// 2. `path` if given (must exist), else llm-panel.toml (if present)
    /// 3. Built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("llm-panel").required(false),
        };

        let config = ConfigLoader::builder()
            // Set defaults
            .set_default("backend.base_url", default_base_url())?
            .set_default("polling.status_interval_ms", default_status_interval() as i64)?
            .set_default("polling.stats_interval_ms", default_stats_interval() as i64)?
            .set_default("polling.logs_interval_ms", default_logs_interval() as i64)?
            .add_source(file)
            // Override with environment variables (PANEL__SECTION__KEY format)
            .add_source(
                Environment::with_prefix("PANEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

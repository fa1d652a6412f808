//! Server configuration and observed server state.

use serde::{Deserialize, Serialize};

use crate::protocol::StartServerRequest;

/// Model file name used when the operator leaves the model field blank.
pub const DEFAULT_MODEL: &str = "model";

/// Parameters the operator edits before starting the inference server.
///
/// Held by the front-end and sent verbatim (after normalization) as the
/// start-command payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Model file name under the backend's models directory.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of layers offloaded to the GPU (`-ngl`).
    #[serde(default = "default_ngl")]
    pub ngl: i32,
    /// Chat template name (e.g. "chatml").
    #[serde(default = "default_template")]
    pub template: String,
    /// Extra command-line flags appended by the backend.
    #[serde(default)]
    pub custom_params: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            host: default_host(),
            port: default_port(),
            ngl: default_ngl(),
            template: default_template(),
            custom_params: String::new(),
        }
    }
}

impl ServerConfig {
    /// Build the start-command payload.
    ///
    /// A blank model falls back to [`DEFAULT_MODEL`] and custom params are
    /// trimmed of surrounding whitespace.
    pub fn to_start_request(&self) -> StartServerRequest {
        let model = self.model.trim();
        StartServerRequest {
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
            host: self.host.clone(),
            port: self.port,
            ngl: self.ngl,
            template: self.template.clone(),
            custom_params: self.custom_params.trim().to_string(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    1337
}
fn default_ngl() -> i32 {
    30
}
fn default_template() -> String {
    "chatml".to_string()
}

/// Run state of the remote inference server as observed by the client.
///
/// Never persisted; recomputed from each poll response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    /// No poll has completed yet.
    #[default]
    Unknown,
    Running,
    Stopped,
}

impl ServerStatus {
    /// Derive the status from the backend's `server_running` flag.
    ///
    /// A missing or null flag means the backend has no live process.
    pub fn from_running_flag(flag: Option<bool>) -> Self {
        if flag == Some(true) {
            ServerStatus::Running
        } else {
            ServerStatus::Stopped
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Unknown => write!(f, "Unknown"),
            ServerStatus::Running => write!(f, "Running"),
            ServerStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Host resource utilization in percent.
///
/// Values come straight from the backend and are not range-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu: f32,
    pub ram: f32,
    pub gpu: f32,
}

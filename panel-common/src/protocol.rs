//! Wire types for the control backend's REST API.
//!
//! The backend is a small HTTP service that owns the inference-server process.
//! All request and response bodies are JSON except `GET /logs/`.
//!
//! # Endpoints
//!
//! | Method | Path                 | Request                   | Response                 |
//! |--------|----------------------|---------------------------|--------------------------|
//! | GET    | `/stats/`            | -                         | [`StatsResponse`]        |
//! | GET    | `/logs/`             | -                         | text                     |
//! | GET    | `/list-models/`      | -                         | [`ModelListResponse`]    |
//! | POST   | `/start-server/`     | [`StartServerRequest`]    | 2xx or [`ErrorDetail`]   |
//! | POST   | `/stop-server/`      | -                         | 2xx or [`ErrorDetail`]   |
//! | POST   | `/download-model/`   | [`DownloadModelRequest`]  | 2xx or [`ErrorDetail`]   |
//! | GET    | `/allowlist/`        | -                         | [`AllowlistResponse`]    |
//! | POST   | `/update-allowlist/` | [`AllowlistUpdateRequest`]| [`AllowlistResponse`]    |

use serde::{Deserialize, Serialize};

use crate::allowlist::AllowlistConfig;

pub const STATS_PATH: &str = "/stats/";
pub const LOGS_PATH: &str = "/logs/";
pub const LIST_MODELS_PATH: &str = "/list-models/";
pub const START_SERVER_PATH: &str = "/start-server/";
pub const STOP_SERVER_PATH: &str = "/stop-server/";
pub const DOWNLOAD_MODEL_PATH: &str = "/download-model/";
pub const ALLOWLIST_PATH: &str = "/allowlist/";
pub const UPDATE_ALLOWLIST_PATH: &str = "/update-allowlist/";

/// Response of `GET /stats/`.
///
/// Run state and utilization are served together; the status and stats
/// pollers each read their own slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// `null` when the backend never started a process.
    #[serde(default)]
    pub server_running: Option<bool>,
    #[serde(default)]
    pub cpu: Option<f32>,
    #[serde(default)]
    pub ram: Option<f32>,
    #[serde(default)]
    pub gpu: Option<f32>,
}

/// Response of `GET /list-models/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListResponse {
    #[serde(default)]
    pub models: Vec<String>,
}

/// Body of `POST /start-server/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartServerRequest {
    pub model: String,
    pub host: String,
    pub port: u16,
    pub ngl: i32,
    pub template: String,
    pub custom_params: String,
}

/// Body of `POST /download-model/`.
///
/// Free-text downloads omit `filename`; the backend then saves the file as
/// `model.gguf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadModelRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Response of the allowlist endpoints.
///
/// Older backends only know a single `allowlist` shared by both surfaces.
/// Newer ones report the two surfaces separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_panel_allowlist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_server_allowlist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowlist: Option<String>,
}

impl AllowlistResponse {
    /// Fold either response shape into an [`AllowlistConfig`].
    ///
    /// The two-field shape wins when present. A missing named field falls back
    /// to the legacy value; `None` if neither is available.
    pub fn normalize(self) -> Option<AllowlistConfig> {
        let legacy = self.allowlist;
        let control_panel = self.control_panel_allowlist.or_else(|| legacy.clone())?;
        let llm_server = self.llm_server_allowlist.or(legacy)?;
        Some(AllowlistConfig {
            control_panel,
            llm_server,
        })
    }
}

/// Body of `POST /update-allowlist/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistUpdateRequest {
    pub control_panel_allowlist: String,
    pub llm_server_allowlist: String,
}

impl From<&AllowlistConfig> for AllowlistUpdateRequest {
    fn from(config: &AllowlistConfig) -> Self {
        Self {
            control_panel_allowlist: config.control_panel.clone(),
            llm_server_allowlist: config.llm_server.clone(),
        }
    }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_with_null_flag() {
        let json = r#"{"cpu": 12.5, "ram": 40.0, "gpu": 0, "server_running": null}"#;
        let stats: StatsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(stats.server_running, None);
        assert_eq!(stats.cpu, Some(12.5));
        assert_eq!(stats.gpu, Some(0.0));
    }

    #[test]
    fn test_download_request_without_filename() {
        let request = DownloadModelRequest {
            url: "https://example.com/m.gguf".to_string(),
            filename: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"url":"https://example.com/m.gguf"}"#);
    }

    #[test]
    fn test_normalize_legacy_allowlist() {
        let response: AllowlistResponse =
            serde_json::from_str(r#"{"allowlist": "10.0.0.1"}"#).unwrap();
        let config = response.normalize().unwrap();
        assert_eq!(config.control_panel, "10.0.0.1");
        assert_eq!(config.llm_server, "10.0.0.1");
    }

    #[test]
    fn test_normalize_prefers_two_field_shape() {
        let response: AllowlistResponse = serde_json::from_str(
            r#"{
                "allowlist": "1.1.1.1",
                "control_panel_allowlist": "10.0.0.1",
                "llm_server_allowlist": "0.0.0.0"
            }"#,
        )
        .unwrap();
        let config = response.normalize().unwrap();
        assert_eq!(config.control_panel, "10.0.0.1");
        assert_eq!(config.llm_server, "0.0.0.0");
    }

    #[test]
    fn test_normalize_partial_two_field_uses_legacy() {
        let response = AllowlistResponse {
            control_panel_allowlist: Some("10.0.0.1".to_string()),
            llm_server_allowlist: None,
            allowlist: Some("0.0.0.0".to_string()),
        };
        let config = response.normalize().unwrap();
        assert_eq!(config.control_panel, "10.0.0.1");
        assert_eq!(config.llm_server, "0.0.0.0");
    }

    #[test]
    fn test_normalize_empty_response() {
        assert!(AllowlistResponse::default().normalize().is_none());
    }
}

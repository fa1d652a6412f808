//! REST client for the control backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use panel_common::protocol::{
    ALLOWLIST_PATH, DOWNLOAD_MODEL_PATH, LIST_MODELS_PATH, LOGS_PATH, START_SERVER_PATH, STATS_PATH,
    STOP_SERVER_PATH, UPDATE_ALLOWLIST_PATH,
};
use panel_common::{
    AllowlistConfig, AllowlistResponse, AllowlistUpdateRequest, DownloadModelRequest, ErrorDetail,
    ModelListResponse, StartServerRequest, StatsResponse,
};

use super::ControlApi;
use crate::error::{Error, Result};

/// HTTP gateway to the control backend.
///
/// Thin wrapper: builds requests, maps non-2xx responses to
/// [`Error::Rejected`] and decodes bodies.
pub struct HttpGateway {
    http_client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a gateway whose requests give up after `timeout`.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http_client.get(self.url(path)).send().await?;
        let response = check_status(response).await?;
        response.json().await.map_err(|e| Error::Decode(e.to_string()))
    }

    async fn post_json<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self.http_client.post(self.url(path)).json(body).send().await?;
        check_status(response).await
    }
}

/// Turn a non-2xx response into [`Error::Rejected`], using the backend's
/// `detail` message when the body carries one.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorDetail>(&body)
        .map(|e| e.detail)
        .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));

    Err(Error::Rejected {
        status: status.as_u16(),
        detail,
    })
}

/// The backend serializes the log file as a JSON string; fall back to the
/// raw body for plain-text responses.
fn decode_log_body(body: String) -> String {
    serde_json::from_str::<String>(&body).unwrap_or(body)
}

#[async_trait]
impl ControlApi for HttpGateway {
    async fn stats(&self) -> Result<StatsResponse> {
        self.get_json(STATS_PATH).await
    }

    async fn logs(&self) -> Result<String> {
        let response = self.http_client.get(self.url(LOGS_PATH)).send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        Ok(decode_log_body(body))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let list: ModelListResponse = self.get_json(LIST_MODELS_PATH).await?;
        Ok(list.models)
    }

    async fn start_server(&self, request: &StartServerRequest) -> Result<()> {
        tracing::debug!(model = %request.model, port = request.port, "POST {}", START_SERVER_PATH);
        self.post_json(START_SERVER_PATH, request).await?;
        Ok(())
    }

    async fn stop_server(&self) -> Result<()> {
        tracing::debug!("POST {}", STOP_SERVER_PATH);
        let response = self.http_client.post(self.url(STOP_SERVER_PATH)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn download_model(&self, request: &DownloadModelRequest) -> Result<()> {
        tracing::debug!(url = %request.url, filename = ?request.filename, "POST {}", DOWNLOAD_MODEL_PATH);
        self.post_json(DOWNLOAD_MODEL_PATH, request).await?;
        Ok(())
    }

    async fn allowlist(&self) -> Result<AllowlistConfig> {
        let response: AllowlistResponse = self.get_json(ALLOWLIST_PATH).await?;
        response
            .normalize()
            .ok_or_else(|| Error::Decode("allowlist response has no allowlist fields".to_string()))
    }

    async fn update_allowlist(&self, request: &AllowlistUpdateRequest) -> Result<AllowlistConfig> {
        let response = self.post_json(UPDATE_ALLOWLIST_PATH, request).await?;
        let accepted: AllowlistResponse = response
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;
        accepted
            .normalize()
            .ok_or_else(|| Error::Decode("allowlist response has no allowlist fields".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = HttpGateway::new("http://localhost:8000/");
        assert_eq!(gateway.base_url(), "http://localhost:8000");
        assert_eq!(gateway.url(STATS_PATH), "http://localhost:8000/stats/");
    }

    #[test]
    fn test_relative_api_base() {
        let gateway = HttpGateway::new("http://panel.local/api");
        assert_eq!(gateway.url(LOGS_PATH), "http://panel.local/api/logs/");
    }

    #[test]
    fn test_decode_log_body_json_string() {
        assert_eq!(decode_log_body(r#""line 1\nline 2""#.to_string()), "line 1\nline 2");
    }

    #[test]
    fn test_decode_log_body_plain_text() {
        assert_eq!(decode_log_body("plain log".to_string()), "plain log");
        assert_eq!(decode_log_body(String::new()), "");
    }
}

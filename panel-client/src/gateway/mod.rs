//! Access to the control backend.
//!
//! This module defines the `ControlApi` trait that the synchronization core
//! talks to, and `HttpGateway`, its REST implementation.

mod client;

pub use client::HttpGateway;

use async_trait::async_trait;
use panel_common::{
    AllowlistConfig, AllowlistUpdateRequest, DownloadModelRequest, StartServerRequest, StatsResponse,
};

use crate::error::Result;

/// Operations exposed by the control backend.
///
/// Implementations only build requests and decode responses; interpreting
/// failures is left to the callers.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Run state and host utilization.
    async fn stats(&self) -> Result<StatsResponse>;

    /// Current contents of the inference server's log file.
    async fn logs(&self) -> Result<String>;

    /// Model files present on the backend.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Launch the inference server.
    async fn start_server(&self, request: &StartServerRequest) -> Result<()>;

    /// Terminate the inference server.
    async fn stop_server(&self) -> Result<()>;

    /// Have the backend fetch a model file.
    async fn download_model(&self, request: &DownloadModelRequest) -> Result<()>;

    /// Current allowlists, normalized to the two-field shape.
    async fn allowlist(&self) -> Result<AllowlistConfig>;

    /// Replace both allowlists; returns what the backend accepted.
    async fn update_allowlist(&self, request: &AllowlistUpdateRequest) -> Result<AllowlistConfig>;
}

//! Scripted in-memory backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use panel_common::{
    AllowlistConfig, AllowlistUpdateRequest, DownloadModelRequest, StartServerRequest, StatsResponse,
};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::gateway::ControlApi;

/// Canned outcome of one call.
#[derive(Debug)]
pub enum Reply<T> {
    Ok(T),
    /// Connection-level failure.
    Transport,
    /// Non-2xx with a `detail` body.
    Rejected(u16, &'static str),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Transport => Err(Error::Transport("connection refused".to_string())),
            Reply::Rejected(status, detail) => Err(Error::Rejected {
                status,
                detail: detail.to_string(),
            }),
        }
    }
}

struct Step<T> {
    reply: Reply<T>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Queue of replies for one endpoint. An exhausted script answers with a
/// transport failure.
pub struct Script<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    calls: AtomicUsize,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<T> Script<T> {
    pub fn push(&self, reply: Reply<T>) {
        self.steps.lock().unwrap().push_back(Step { reply, gate: None });
    }

    /// Queue a reply that is held back until the returned sender fires.
    pub fn push_gated(&self, reply: Reply<T>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().unwrap().push_back(Step {
            reply,
            gate: Some(rx),
        });
        tx
    }

    /// Number of requests issued so far, answered or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        let Some(step) = step else {
            return Err(Error::Transport("no scripted reply".to_string()));
        };
        if let Some(gate) = step.gate {
            let _ = gate.await;
        }
        step.reply.into_result()
    }
}

/// Backend double with one script per endpoint and a record of request bodies.
#[derive(Default)]
pub struct FakeApi {
    pub stats: Script<StatsResponse>,
    pub logs: Script<String>,
    pub models: Script<Vec<String>>,
    pub start: Script<()>,
    pub stop: Script<()>,
    pub download: Script<()>,
    pub allowlist: Script<AllowlistConfig>,
    pub update_allowlist: Script<AllowlistConfig>,
    pub start_requests: Mutex<Vec<StartServerRequest>>,
    pub download_requests: Mutex<Vec<DownloadModelRequest>>,
    pub update_requests: Mutex<Vec<AllowlistUpdateRequest>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ControlApi for FakeApi {
    async fn stats(&self) -> Result<StatsResponse> {
        self.stats.next().await
    }

    async fn logs(&self) -> Result<String> {
        self.logs.next().await
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.models.next().await
    }

    async fn start_server(&self, request: &StartServerRequest) -> Result<()> {
        self.start_requests.lock().unwrap().push(request.clone());
        self.start.next().await
    }

    async fn stop_server(&self) -> Result<()> {
        self.stop.next().await
    }

    async fn download_model(&self, request: &DownloadModelRequest) -> Result<()> {
        self.download_requests.lock().unwrap().push(request.clone());
        self.download.next().await
    }

    async fn allowlist(&self) -> Result<AllowlistConfig> {
        self.allowlist.next().await
    }

    async fn update_allowlist(&self, request: &AllowlistUpdateRequest) -> Result<AllowlistConfig> {
        self.update_requests.lock().unwrap().push(request.clone());
        self.update_allowlist.next().await
    }
}

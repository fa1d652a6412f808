//! Server run-state polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use panel_common::ServerStatus;
use tokio::sync::watch;

use super::poll_loop::{PollLoop, PollTask};
use crate::gateway::ControlApi;
use crate::scheduler::Scheduler;
use crate::state::StatusCell;

struct StatusTask {
    api: Arc<dyn ControlApi>,
    status: Arc<StatusCell>,
}

#[async_trait]
impl PollTask for StatusTask {
    /// Status-cell epoch at issue time and the observed status.
    type Output = (u64, ServerStatus);

    async fn fetch(&self) -> Self::Output {
        let epoch = self.status.epoch();
        let status = match self.api.stats().await {
            Ok(stats) => ServerStatus::from_running_flag(stats.server_running),
            Err(e) => {
                // No answer is treated as no server.
                tracing::warn!("Status poll failed, reporting server as stopped: {}", e);
                ServerStatus::Stopped
            }
        };
        (epoch, status)
    }

    fn apply(&self, (epoch, status): Self::Output) {
        if !self.status.apply_observed(epoch, status) {
            tracing::debug!("Status poll superseded by an optimistic update");
        }
    }
}

/// Periodically asks the backend whether the inference server is running.
pub struct StatusPoller {
    poll: PollLoop<StatusTask>,
}

impl StatusPoller {
    pub fn new(
        api: Arc<dyn ControlApi>,
        status: Arc<StatusCell>,
        scheduler: Arc<dyn Scheduler>,
        every: Duration,
    ) -> Self {
        Self {
            poll: PollLoop::new("status", every, StatusTask { api, status }, scheduler),
        }
    }

    /// Poll now and then every interval.
    pub fn activate(&self) {
        self.poll.activate();
    }

    pub fn deactivate(&self) {
        self.poll.deactivate();
    }

    pub fn is_active(&self) -> bool {
        self.poll.is_active()
    }

    pub fn is_busy(&self) -> bool {
        self.poll.is_busy()
    }

    pub fn interval(&self) -> Duration {
        self.poll.every()
    }

    pub fn status(&self) -> ServerStatus {
        self.poll.task().status.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.poll.task().status.subscribe()
    }
}

//! Log tailing while the logs view is open.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::poll_loop::{PollLoop, PollTask};
use crate::gateway::ControlApi;
use crate::scheduler::Scheduler;
use crate::state::{LogBuffer, LogCell};

struct LogTask {
    api: Arc<dyn ControlApi>,
    logs: Arc<LogCell>,
}

#[async_trait]
impl PollTask for LogTask {
    /// Log-cell epoch at issue time and the fetched buffer.
    type Output = (u64, LogBuffer);

    async fn fetch(&self) -> Self::Output {
        let epoch = self.logs.epoch();
        let buffer = match self.api.logs().await {
            Ok(text) => LogBuffer::Contents(text),
            Err(e) => {
                tracing::warn!("Log fetch failed: {}", e);
                LogBuffer::FetchFailed
            }
        };
        (epoch, buffer)
    }

    fn apply(&self, (epoch, buffer): Self::Output) {
        if !self.logs.apply_fetched(epoch, buffer) {
            tracing::debug!("Log fetch superseded by a cleared buffer");
        }
    }
}

/// Refreshes the log buffer on a short interval while active.
///
/// Deactivating keeps the last buffer; only a server stop clears it.
pub struct LogTailer {
    poll: PollLoop<LogTask>,
}

impl LogTailer {
    pub fn new(
        api: Arc<dyn ControlApi>,
        logs: Arc<LogCell>,
        scheduler: Arc<dyn Scheduler>,
        every: Duration,
    ) -> Self {
        Self {
            poll: PollLoop::new("logs", every, LogTask { api, logs }, scheduler),
        }
    }

    pub fn activate(&self) {
        self.poll.activate();
    }

    pub fn deactivate(&self) {
        self.poll.deactivate();
    }

    pub fn is_active(&self) -> bool {
        self.poll.is_active()
    }

    pub fn buffer(&self) -> LogBuffer {
        self.poll.task().logs.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<LogBuffer> {
        self.poll.task().logs.subscribe()
    }
}

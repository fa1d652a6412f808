//! Host utilization polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use panel_common::{StatsResponse, SystemStats};
use tokio::sync::watch;

use super::poll_loop::{PollLoop, PollTask};
use crate::gateway::ControlApi;
use crate::scheduler::Scheduler;

struct StatsTask {
    api: Arc<dyn ControlApi>,
    stats: watch::Sender<SystemStats>,
}

fn utilization(response: StatsResponse) -> Option<SystemStats> {
    Some(SystemStats {
        cpu: response.cpu?,
        ram: response.ram?,
        gpu: response.gpu?,
    })
}

#[async_trait]
impl PollTask for StatsTask {
    type Output = Option<SystemStats>;

    async fn fetch(&self) -> Self::Output {
        match self.api.stats().await {
            Ok(response) => {
                let stats = utilization(response);
                if stats.is_none() {
                    tracing::warn!("Stats response missing utilization fields, keeping last values");
                }
                stats
            }
            Err(e) => {
                tracing::warn!("Stats poll failed, keeping last values: {}", e);
                None
            }
        }
    }

    fn apply(&self, output: Self::Output) {
        // Missing stats say nothing about the server; keep what we had.
        let Some(stats) = output else {
            return;
        };
        self.stats.send_if_modified(|current| {
            if *current == stats {
                false
            } else {
                *current = stats;
                true
            }
        });
    }
}

/// Periodically fetches CPU, RAM and GPU utilization.
pub struct StatsPoller {
    poll: PollLoop<StatsTask>,
}

impl StatsPoller {
    pub fn new(api: Arc<dyn ControlApi>, scheduler: Arc<dyn Scheduler>, every: Duration) -> Self {
        let (stats, _rx) = watch::channel(SystemStats::default());
        Self {
            poll: PollLoop::new("stats", every, StatsTask { api, stats }, scheduler),
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

    pub fn interval(&self) -> Duration {
        self.poll.every()
    }

    pub fn stats(&self) -> SystemStats {
        *self.poll.task().stats.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SystemStats> {
        self.poll.task().stats.subscribe()
    }
}

//! Test doubles for the backend API and the scheduler.

mod fake_api;
mod manual_scheduler;

pub use fake_api::{FakeApi, Reply};
pub use manual_scheduler::ManualScheduler;

use panel_common::StatsResponse;

/// Let spawned request tasks run to completion on the test runtime.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Stats response carrying only the run flag plus idle utilization.
pub fn running(flag: bool) -> StatsResponse {
    StatsResponse {
        server_running: Some(flag),
        cpu: Some(0.0),
        ram: Some(0.0),
        gpu: Some(0.0),
    }
}

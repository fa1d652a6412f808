//! Periodic callback scheduling.
//!
//! Pollers never own timers directly; they ask a [`Scheduler`] for one and
//! hold the returned [`ScheduleHandle`] for as long as they are active.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Callback invoked on every tick.
pub type TickFn = Arc<dyn Fn() + Send + Sync>;

/// Source of repeating timers.
pub trait Scheduler: Send + Sync {
    /// Invoke `tick` every `every`, first one period from now.
    fn schedule(&self, every: Duration, tick: TickFn) -> ScheduleHandle;
}

/// Cancels its timer when cancelled or dropped.
#[derive(Debug)]
pub struct ScheduleHandle {
    token: CancellationToken,
}

impl ScheduleHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Scheduler backed by Tokio timers. Must be used inside a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, every: Duration, tick: TickFn) -> ScheduleHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => tick(),
                }
            }
        });

        ScheduleHandle::new(token)
    }
}

//! Scheduler whose ticks are fired by the test.

use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::scheduler::{ScheduleHandle, Scheduler, TickFn};

struct Timer {
    every: Duration,
    tick: TickFn,
    token: CancellationToken,
}

/// Records scheduled timers; [`ManualScheduler::fire`] plays one tick
/// boundary for every live timer.
#[derive(Default)]
pub struct ManualScheduler {
    timers: Mutex<Vec<Timer>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every live timer once.
    pub fn fire(&self) {
        self.fire_matching(|_| true);
    }

    /// Invoke live timers with the given period once.
    pub fn fire_every(&self, every: Duration) {
        self.fire_matching(|t| t == every);
    }

    fn fire_matching(&self, filter: impl Fn(Duration) -> bool) {
        // Collect first so callbacks can schedule without deadlocking.
        let ticks: Vec<TickFn> = self
            .timers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.token.is_cancelled() && filter(t.every))
            .map(|t| t.tick.clone())
            .collect();
        for tick in ticks {
            tick();
        }
    }

    /// Number of timers not yet cancelled.
    pub fn active(&self) -> usize {
        self.timers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.token.is_cancelled())
            .count()
    }

    /// Periods of live timers, in scheduling order.
    pub fn intervals(&self) -> Vec<Duration> {
        self.timers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.token.is_cancelled())
            .map(|t| t.every)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, every: Duration, tick: TickFn) -> ScheduleHandle {
        let token = CancellationToken::new();
        self.timers.lock().unwrap().push(Timer {
            every,
            tick,
            token: token.clone(),
        });
        ScheduleHandle::new(token)
    }
}

//! Activation, skip-on-busy and stale-response bookkeeping shared by pollers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::scheduler::{ScheduleHandle, Scheduler};

/// One fetch-and-apply cycle of a poller.
#[async_trait]
pub(crate) trait PollTask: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Issue the request. Must not touch shared state.
    async fn fetch(&self) -> Self::Output;

    /// Publish a result. Only called for requests of the current activation.
    fn apply(&self, output: Self::Output);
}

/// Identifies the activation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    generation: u64,
}

#[derive(Debug, Default)]
struct GuardState {
    generation: u64,
    active: bool,
    busy: bool,
    handle: Option<ScheduleHandle>,
}

/// Tracks the activation generation and the single outstanding request.
#[derive(Debug, Default)]
pub(crate) struct PollGuard {
    state: Mutex<GuardState>,
}

impl PollGuard {
    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new activation. `None` if already active.
    pub fn activate(&self) -> Option<u64> {
        let mut state = self.lock();
        if state.active {
            return None;
        }
        state.generation += 1;
        state.active = true;
        state.busy = false;
        Some(state.generation)
    }

    /// Keep the timer of `generation`; a timer for a closed activation is
    /// cancelled right away.
    pub fn attach(&self, generation: u64, handle: ScheduleHandle) {
        let mut state = self.lock();
        if state.active && state.generation == generation {
            state.handle = Some(handle);
        } else {
            handle.cancel();
        }
    }

    /// Close the current activation. Cancels its timer and orphans any
    /// request still in flight. Returns `false` if it was not active.
    pub fn deactivate(&self) -> bool {
        let mut state = self.lock();
        if !state.active {
            return false;
        }
        state.generation += 1;
        state.active = false;
        state.busy = false;
        if let Some(handle) = state.handle.take() {
            handle.cancel();
        }
        true
    }

    /// Claim the request slot for `generation`. `None` when the activation
    /// is gone or a request is already in flight.
    pub fn begin(&self, generation: u64) -> Option<Ticket> {
        let mut state = self.lock();
        if !state.active || state.generation != generation || state.busy {
            return None;
        }
        state.busy = true;
        Some(Ticket { generation })
    }

    /// Release the request slot and run `apply` if the ticket is still
    /// current. Returns whether `apply` ran.
    pub fn finish(&self, ticket: Ticket, apply: impl FnOnce()) -> bool {
        let mut state = self.lock();
        if state.generation != ticket.generation {
            return false;
        }
        state.busy = false;
        apply();
        true
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }
}

/// Drives a [`PollTask`]: immediate fetch on activation, then one fetch per
/// tick, skipping ticks while a request is outstanding.
pub(crate) struct PollLoop<T: PollTask> {
    name: &'static str,
    every: Duration,
    task: Arc<T>,
    guard: Arc<PollGuard>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T: PollTask> PollLoop<T> {
    pub fn new(name: &'static str, every: Duration, task: T, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            name,
            every,
            task: Arc::new(task),
            guard: Arc::new(PollGuard::default()),
            scheduler,
        }
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn every(&self) -> Duration {
        self.every
    }

    /// Start polling. No-op if already active. Requires a Tokio runtime.
    pub fn activate(&self) {
        let Some(generation) = self.guard.activate() else {
            return;
        };
        tracing::debug!(poller = self.name, generation, "Activating poller");

        Self::tick(self.name, &self.task, &self.guard, generation);

        let (name, task, guard) = (self.name, self.task.clone(), self.guard.clone());
        let handle = self.scheduler.schedule(
            self.every,
            Arc::new(move || Self::tick(name, &task, &guard, generation)),
        );
        self.guard.attach(generation, handle);
    }

    /// Stop polling; a response still in flight will be discarded.
    pub fn deactivate(&self) {
        if self.guard.deactivate() {
            tracing::debug!(poller = self.name, "Deactivated poller");
        }
    }

    pub fn is_active(&self) -> bool {
        self.guard.is_active()
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    fn tick(name: &'static str, task: &Arc<T>, guard: &Arc<PollGuard>, generation: u64) {
        let Some(ticket) = guard.begin(generation) else {
            tracing::debug!(poller = name, "Request still in flight, skipping tick");
            return;
        };

        let (task, guard) = (task.clone(), guard.clone());
        tokio::spawn(async move {
            let output = task.fetch().await;
            if !guard.finish(ticket, || task.apply(output)) {
                tracing::debug!(poller = name, "Discarding response from a closed activation");
            }
        });
    }
}

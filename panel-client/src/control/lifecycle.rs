//! Start/stop command state machine.

use std::sync::Arc;

use panel_common::{ServerConfig, ServerStatus};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::gateway::ControlApi;
use crate::state::{LogCell, StatusCell};

pub const START_SUCCESS_MESSAGE: &str = "Server started successfully!";
pub const STOP_SUCCESS_MESSAGE: &str = "Server stopped successfully!";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error occurred. Please try again.";

/// A state the controller rests in between commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StablePhase {
    Idle,
    Running,
    Stopped,
}

impl From<StablePhase> for LifecycleState {
    fn from(phase: StablePhase) -> Self {
        match phase {
            StablePhase::Idle => LifecycleState::Idle,
            StablePhase::Running => LifecycleState::Running,
            StablePhase::Stopped => LifecycleState::Stopped,
        }
    }
}

/// Command-level state of the inference server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing known yet and no command issued.
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    /// Last command failed; behaves like `fallback` for new commands.
    Error { message: String, fallback: StablePhase },
}

impl LifecycleState {
    /// The stable state new commands are judged against; `None` while a
    /// command is in flight.
    pub fn stable_phase(&self) -> Option<StablePhase> {
        match self {
            LifecycleState::Idle => Some(StablePhase::Idle),
            LifecycleState::Running => Some(StablePhase::Running),
            LifecycleState::Stopped => Some(StablePhase::Stopped),
            LifecycleState::Error { fallback, .. } => Some(*fallback),
            LifecycleState::Starting | LifecycleState::Stopping => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.stable_phase().is_none()
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LifecycleState::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Stopping => write!(f, "stopping"),
            LifecycleState::Stopped => write!(f, "stopped"),
            LifecycleState::Error { message, .. } => write!(f, "in error ({})", message),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Start,
    Stop,
}

impl Command {
    fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
        }
    }

    fn allowed_from(self, phase: StablePhase) -> bool {
        match self {
            Command::Start => matches!(phase, StablePhase::Idle | StablePhase::Stopped),
            Command::Stop => phase == StablePhase::Running,
        }
    }

    fn in_flight(self) -> LifecycleState {
        match self {
            Command::Start => LifecycleState::Starting,
            Command::Stop => LifecycleState::Stopping,
        }
    }

    fn failure_message(self, error: &Error) -> String {
        match error {
            Error::Rejected { detail, .. } => match self {
                Command::Start => format!("Failed to start server: {}", detail),
                Command::Stop => format!("Failed to stop server: {}", detail),
            },
            _ => NETWORK_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Issues start/stop commands, one at a time.
///
/// The status poller owns observation; this controller adopts the observed
/// status as its stable state whenever no command is in flight, and writes
/// an optimistic status after each successful command.
pub struct ServerLifecycleController {
    api: Arc<dyn ControlApi>,
    status: Arc<StatusCell>,
    logs: Arc<LogCell>,
    state: watch::Sender<LifecycleState>,
}

impl ServerLifecycleController {
    pub fn new(api: Arc<dyn ControlApi>, status: Arc<StatusCell>, logs: Arc<LogCell>) -> Self {
        let (state, _rx) = watch::channel(LifecycleState::Idle);
        Self {
            api,
            status,
            logs,
            state,
        }
    }

    /// Current state, reconciled with the latest observed status.
    pub fn state(&self) -> LifecycleState {
        self.reconcile();
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    /// Whether a start button should be enabled.
    pub fn can_start(&self) -> bool {
        self.state()
            .stable_phase()
            .is_some_and(|p| Command::Start.allowed_from(p))
    }

    /// Whether a stop button should be enabled.
    pub fn can_stop(&self) -> bool {
        self.state()
            .stable_phase()
            .is_some_and(|p| Command::Stop.allowed_from(p))
    }

    /// Adopt the observed server status as the stable state. Leaves
    /// in-flight commands alone and keeps a pending error message.
    pub fn reconcile(&self) {
        let target = match self.status.get() {
            ServerStatus::Running => StablePhase::Running,
            ServerStatus::Stopped => StablePhase::Stopped,
            ServerStatus::Unknown => return,
        };

        self.state.send_if_modified(|state| match state {
            LifecycleState::Starting | LifecycleState::Stopping => false,
            LifecycleState::Error { fallback, .. } => {
                if *fallback == target {
                    false
                } else {
                    *fallback = target;
                    true
                }
            }
            stable => {
                let next = LifecycleState::from(target);
                if *stable == next {
                    false
                } else {
                    *stable = next;
                    true
                }
            }
        });
    }

    /// Reconcile on every observed status change until `cancel` fires, so
    /// subscribers see the stable state follow the status poller.
    pub async fn follow_status(&self, cancel: CancellationToken) {
        let mut status = self.status.subscribe();
        loop {
            self.reconcile();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Start the inference server with `config`.
    pub async fn start(&self, config: &ServerConfig) -> Result<()> {
        let command = self.begin(Command::Start)?;
        let request = config.to_start_request();
        tracing::info!(model = %request.model, host = %request.host, port = request.port, "Starting server");

        match self.api.start_server(&request).await {
            Ok(()) => {
                self.status.set_optimistic(ServerStatus::Running);
                command.finish(LifecycleState::Running);
                tracing::info!("{}", START_SUCCESS_MESSAGE);
                Ok(())
            }
            Err(e) => Err(command.fail(e)),
        }
    }

    /// Stop the inference server.
    pub async fn stop(&self) -> Result<()> {
        let command = self.begin(Command::Stop)?;
        tracing::info!("Stopping server");

        match self.api.stop_server().await {
            Ok(()) => {
                self.status.set_optimistic(ServerStatus::Stopped);
                self.logs.clear();
                command.finish(LifecycleState::Stopped);
                tracing::info!("{}", STOP_SUCCESS_MESSAGE);
                Ok(())
            }
            Err(e) => Err(command.fail(e)),
        }
    }

    /// Atomically check the transition and mark the command in flight.
    fn begin(&self, command: Command) -> Result<InFlight<'_>> {
        self.reconcile();

        let mut outcome = Err(Error::CommandInFlight);
        self.state.send_if_modified(|state| {
            let Some(phase) = state.stable_phase() else {
                return false;
            };
            if !command.allowed_from(phase) {
                outcome = Err(Error::InvalidTransition {
                    action: command.name(),
                    state: state.to_string(),
                });
                return false;
            }
            *state = command.in_flight();
            outcome = Ok(phase);
            true
        });

        match outcome {
            Ok(prior) => Ok(InFlight {
                state: &self.state,
                command,
                prior,
                done: false,
            }),
            Err(e) => {
                tracing::debug!("Rejected {} command: {}", command.name(), e);
                Err(e)
            }
        }
    }
}

/// A command marked in flight. Dropping it unfinished (the caller's future
/// was cancelled) returns the controller to the prior stable state.
struct InFlight<'a> {
    state: &'a watch::Sender<LifecycleState>,
    command: Command,
    prior: StablePhase,
    done: bool,
}

impl InFlight<'_> {
    fn finish(mut self, next: LifecycleState) {
        self.done = true;
        self.state.send_replace(next);
    }

    fn fail(self, error: Error) -> Error {
        let message = self.command.failure_message(&error);
        tracing::error!("{}", message);
        let fallback = self.prior;
        self.finish(LifecycleState::Error { message, fallback });
        error
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!("{} command abandoned before the backend answered", self.command.name());
            self.state.send_replace(LifecycleState::from(self.prior));
        }
    }
}

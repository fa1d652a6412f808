//! The control panel: every component wired to one backend, with pollers
//! mounted according to the active view and visibility.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use panel_common::ServerStatus;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::control::{AllowlistManager, ModelDownloadController, ServerLifecycleController};
use crate::gateway::ControlApi;
use crate::scheduler::Scheduler;
use crate::state::{LogCell, StatusCell};
use crate::sync::{LogTailer, ModelCatalogResolver, StatsPoller, StatusPoller};

/// Which panel view is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Config,
    Logs,
    Allowlist,
}

#[derive(Debug, Default)]
struct ViewState {
    view: View,
    mounted: bool,
    /// Polling pauses while the panel is hidden.
    hidden: bool,
    /// Stops the lifecycle controller from following status changes.
    follow: Option<CancellationToken>,
}

/// Owns the pollers and controllers for one backend.
pub struct ControlPanel {
    status: Arc<StatusCell>,
    status_poller: StatusPoller,
    stats_poller: StatsPoller,
    log_tailer: LogTailer,
    catalog: ModelCatalogResolver,
    lifecycle: Arc<ServerLifecycleController>,
    allowlist: Arc<AllowlistManager>,
    download: ModelDownloadController,
    view: Mutex<ViewState>,
}

impl ControlPanel {
    pub fn new(api: Arc<dyn ControlApi>, scheduler: Arc<dyn Scheduler>, polling: &PollingConfig) -> Self {
        let status = Arc::new(StatusCell::new());
        let logs = Arc::new(LogCell::new());

        Self {
            status_poller: StatusPoller::new(
                api.clone(),
                status.clone(),
                scheduler.clone(),
                polling.status_interval(),
            ),
            stats_poller: StatsPoller::new(api.clone(), scheduler.clone(), polling.stats_interval()),
            log_tailer: LogTailer::new(api.clone(), logs.clone(), scheduler, polling.logs_interval()),
            catalog: ModelCatalogResolver::new(api.clone()),
            lifecycle: Arc::new(ServerLifecycleController::new(api.clone(), status.clone(), logs)),
            allowlist: Arc::new(AllowlistManager::new(api.clone())),
            download: ModelDownloadController::new(api),
            status,
            view: Mutex::new(ViewState::default()),
        }
    }

    fn lock_view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start background synchronization. Requires a Tokio runtime.
    pub fn mount(&self) {
        let mut state = self.lock_view();
        if state.mounted {
            return;
        }
        state.mounted = true;
        tracing::info!("Mounting control panel");

        self.catalog.activate();
        let cancel = CancellationToken::new();
        let lifecycle = self.lifecycle.clone();
        let follow = cancel.clone();
        tokio::spawn(async move { lifecycle.follow_status(follow).await });
        state.follow = Some(cancel);

        self.sync_pollers(&state);
        if state.view == View::Allowlist {
            self.load_allowlist();
        }
    }

    /// Stop every poller. Responses still in flight are discarded.
    pub fn unmount(&self) {
        let mut state = self.lock_view();
        if !state.mounted {
            return;
        }
        state.mounted = false;
        tracing::info!("Unmounting control panel");
        if let Some(follow) = state.follow.take() {
            follow.cancel();
        }
        self.sync_pollers(&state);
    }

    pub fn view(&self) -> View {
        self.lock_view().view
    }

    /// Switch views, starting or stopping the log tailer and fetching the
    /// allowlists when their view opens.
    pub fn set_view(&self, view: View) {
        let mut state = self.lock_view();
        if state.view == view {
            return;
        }
        tracing::debug!(from = ?state.view, to = ?view, "Switching view");
        state.view = view;
        self.sync_pollers(&state);

        if view == View::Allowlist && state.mounted {
            self.load_allowlist();
        }
    }

    /// Pause polling while hidden; resume with an immediate fetch.
    pub fn set_visible(&self, visible: bool) {
        let mut state = self.lock_view();
        if state.hidden != visible {
            return;
        }
        state.hidden = !visible;
        tracing::debug!(visible, "Visibility changed");
        self.sync_pollers(&state);
    }

    fn sync_pollers(&self, state: &ViewState) {
        let polling = state.mounted && !state.hidden;

        if polling {
            self.status_poller.activate();
            self.stats_poller.activate();
        } else {
            self.status_poller.deactivate();
            self.stats_poller.deactivate();
        }

        if polling && state.view == View::Logs {
            self.log_tailer.activate();
        } else {
            self.log_tailer.deactivate();
        }
    }

    fn load_allowlist(&self) {
        let allowlist = self.allowlist.clone();
        tokio::spawn(async move {
            // Failures are logged by the manager; the form keeps its values.
            let _ = allowlist.load().await;
        });
    }

    pub fn status(&self) -> ServerStatus {
        self.status.get()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ServerStatus> {
        self.status.subscribe()
    }

    /// Wait until the first status poll has completed.
    pub async fn first_status(&self) -> ServerStatus {
        let mut rx = self.status.subscribe();
        let observed = match rx.wait_for(|s| *s != ServerStatus::Unknown).await {
            Ok(status) => *status,
            Err(_) => self.status.get(),
        };
        observed
    }

    pub fn status_poller(&self) -> &StatusPoller {
        &self.status_poller
    }

    pub fn stats_poller(&self) -> &StatsPoller {
        &self.stats_poller
    }

    pub fn log_tailer(&self) -> &LogTailer {
        &self.log_tailer
    }

    pub fn catalog(&self) -> &ModelCatalogResolver {
        &self.catalog
    }

    pub fn lifecycle(&self) -> &ServerLifecycleController {
        &self.lifecycle
    }

    pub fn allowlist(&self) -> &AllowlistManager {
        &self.allowlist
    }

    pub fn download(&self) -> &ModelDownloadController {
        &self.download
    }
}

impl Drop for ControlPanel {
    fn drop(&mut self) {
        self.unmount();
    }
}

pub mod config;
pub mod control;
pub mod error;
pub mod gateway;
pub mod scheduler;
pub mod shell;
pub mod state;
pub mod sync;

#[cfg(test)]
mod test_util;

pub use config::{Config, PollingConfig, Theme};
pub use control::{
    AllowlistManager, AllowlistState, AllowlistUpdate, DownloadForm, LifecycleState,
    ModelDownloadController, ServerLifecycleController, StablePhase,
};
pub use error::{Error, Result};
pub use gateway::{ControlApi, HttpGateway};
pub use scheduler::{ScheduleHandle, Scheduler, TokioScheduler};
pub use shell::{ControlPanel, View};
pub use state::{LogBuffer, LogCell, StatusCell};
pub use sync::{LogTailer, ModelCatalogResolver, StatsPoller, StatusPoller};

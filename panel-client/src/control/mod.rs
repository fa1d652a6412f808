//! Operator commands: server lifecycle, allowlists and model downloads.

mod allowlist;
mod download;
mod lifecycle;

pub use allowlist::{AllowlistManager, AllowlistState, AllowlistUpdate};
pub use download::{DownloadForm, ModelDownloadController};
pub use lifecycle::{
    LifecycleState, ServerLifecycleController, StablePhase, NETWORK_ERROR_MESSAGE, START_SUCCESS_MESSAGE,
    STOP_SUCCESS_MESSAGE,
};

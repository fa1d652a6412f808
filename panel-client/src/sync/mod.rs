//! Synchronization with the backend's independently changing state.
//!
//! Pollers share one discipline: fetch on activation, then once per tick,
//! skip ticks while a request is outstanding, and drop responses that
//! resolve after the activation that issued them was closed.

mod catalog;
mod logs;
mod poll_loop;
mod stats;
mod status;

pub use catalog::ModelCatalogResolver;
pub use logs::LogTailer;
pub use stats::StatsPoller;
pub use status::StatusPoller;

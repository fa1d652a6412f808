//! LLM Panel Common Types
//!
//! Shared types used by the control client and its front-ends: backend wire
//! format, server configuration, allowlists and the predefined model catalog.

pub mod allowlist;
pub mod catalog;
pub mod protocol;
pub mod server;

pub use allowlist::{validate_allowlist, AllowlistConfig, AllowlistField, AllowlistFormatError, ALLOW_ANY};
pub use catalog::{find_entry, CatalogGroup, ModelCatalogEntry, PREDEFINED_CATALOG};
pub use protocol::{
    AllowlistResponse, AllowlistUpdateRequest, DownloadModelRequest, ErrorDetail, ModelListResponse,
    StartServerRequest, StatsResponse,
};
pub use server::{ServerConfig, ServerStatus, SystemStats, DEFAULT_MODEL};

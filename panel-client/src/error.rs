//! Error types for the control client.

use panel_common::AllowlistField;

/// Error types for client operations.
///
/// Transport and decode failures mean "remote unavailable" and are downgraded
/// by each component; the rest are reported to the operator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Malformed backend response: {0}")]
    Decode(String),

    /// Non-2xx response; `detail` is the backend's message.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: AllowlistField, message: String },

    #[error("Cannot {action} while the server is {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("A server command is already in progress")]
    CommandInFlight,

    #[error("An allowlist update is already in progress")]
    SubmissionInFlight,

    #[error("Allowlist unchanged, nothing to submit")]
    NothingToSubmit,

    #[error("Unknown catalog entry: {0}")]
    UnknownCatalogEntry(String),
}

impl Error {
    /// Whether the failure says nothing about the backend's state.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Decode(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Decode(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

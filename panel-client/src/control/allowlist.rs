//! Allowlist editing and submission.

use std::sync::Arc;

use panel_common::{AllowlistConfig, AllowlistField, AllowlistUpdateRequest};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::gateway::ControlApi;

/// What the operator sees and edits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowlistState {
    /// Last values confirmed by the backend.
    pub current: AllowlistConfig,
    /// Values being edited.
    pub proposed: AllowlistConfig,
    pub submitting: bool,
}

impl AllowlistState {
    /// Submission needs at least one changed field and no update in flight.
    pub fn can_submit(&self) -> bool {
        !self.submitting && self.proposed != self.current
    }
}

/// Result of an accepted update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistUpdate {
    pub accepted: AllowlistConfig,
    /// The inference server only reads its allowlist at startup.
    pub restart_required: bool,
}

impl AllowlistUpdate {
    pub fn message(&self) -> &'static str {
        if self.restart_required {
            "Allowlist updated successfully! Restart the LLM server for the change to take effect."
        } else {
            "Allowlist updated successfully!"
        }
    }
}

/// Fetches, validates and submits the two allowlists.
pub struct AllowlistManager {
    api: Arc<dyn ControlApi>,
    state: watch::Sender<AllowlistState>,
}

impl AllowlistManager {
    pub fn new(api: Arc<dyn ControlApi>) -> Self {
        let (state, _rx) = watch::channel(AllowlistState::default());
        Self { api, state }
    }

    pub fn state(&self) -> AllowlistState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AllowlistState> {
        self.state.subscribe()
    }

    pub fn can_submit(&self) -> bool {
        self.state.borrow().can_submit()
    }

    /// Fetch the current allowlists and reset the edit fields to them.
    ///
    /// On failure the previous values stay in place.
    pub async fn load(&self) -> Result<AllowlistConfig> {
        match self.api.allowlist().await {
            Ok(config) => {
                tracing::debug!(
                    control_panel = %config.control_panel,
                    llm_server = %config.llm_server,
                    "Fetched allowlists"
                );
                self.state.send_modify(|state| {
                    state.current = config.clone();
                    state.proposed = config.clone();
                });
                Ok(config)
            }
            Err(e) => {
                tracing::error!("Failed to fetch allowlist: {}", e);
                Err(e)
            }
        }
    }

    /// Edit one proposed value.
    pub fn propose(&self, field: AllowlistField, value: impl Into<String>) {
        let value = value.into();
        self.state.send_if_modified(|state| {
            if state.proposed.get(field) == value {
                return false;
            }
            state.proposed.set(field, value);
            true
        });
    }

    /// Submit the proposed values.
    ///
    /// Malformed input never reaches the network. On failure the proposed
    /// values are kept so the operator can retry.
    pub async fn submit(&self) -> Result<AllowlistUpdate> {
        let (previous, proposed) = self.begin_submit()?;
        let _release = SubmitRelease { state: &self.state };
        tracing::info!(
            control_panel = %proposed.control_panel,
            llm_server = %proposed.llm_server,
            "Submitting allowlist update"
        );

        let result = self
            .api
            .update_allowlist(&AllowlistUpdateRequest::from(&proposed))
            .await;

        match result {
            Ok(accepted) => {
                self.state.send_modify(|state| {
                    // Edits made while the request was out are kept.
                    if state.proposed == proposed {
                        state.proposed = accepted.clone();
                    }
                    state.current = accepted.clone();
                    state.submitting = false;
                });
                let update = AllowlistUpdate {
                    restart_required: accepted.llm_server != previous.llm_server,
                    accepted,
                };
                tracing::info!("{}", update.message());
                Ok(update)
            }
            Err(e) => {
                tracing::error!("Failed to update allowlist: {}", e);
                self.state.send_modify(|state| state.submitting = false);
                Err(e)
            }
        }
    }

    /// Mark a submission in flight. Returns the confirmed and proposed
    /// values at that moment.
    fn begin_submit(&self) -> Result<(AllowlistConfig, AllowlistConfig)> {
        let mut outcome = Err(Error::SubmissionInFlight);
        self.state.send_if_modified(|state| {
            if state.submitting {
                return false;
            }
            if state.proposed == state.current {
                outcome = Err(Error::NothingToSubmit);
                return false;
            }
            if let Err((field, e)) = state.proposed.validate() {
                outcome = Err(Error::Validation {
                    field,
                    message: e.to_string(),
                });
                return false;
            }
            state.submitting = true;
            outcome = Ok((state.current.clone(), state.proposed.clone()));
            true
        });
        outcome
    }
}

/// Clears the in-flight flag even when the submitting future is dropped
/// before the backend answers.
struct SubmitRelease<'a> {
    state: &'a watch::Sender<AllowlistState>,
}

impl Drop for SubmitRelease<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if !state.submitting {
                return false;
            }
            tracing::warn!("Allowlist submission abandoned before the backend answered");
            state.submitting = false;
            true
        });
    }
}

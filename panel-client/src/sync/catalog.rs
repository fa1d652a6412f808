//! Installed model discovery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::gateway::ControlApi;

struct ResolverInner {
    api: Arc<dyn ControlApi>,
    started: AtomicBool,
    models: watch::Sender<Vec<String>>,
}

/// Fetches the list of model files on the backend once.
///
/// A failed fetch leaves the list empty; the operator can still type a model
/// name by hand.
#[derive(Clone)]
pub struct ModelCatalogResolver {
    inner: Arc<ResolverInner>,
}

impl ModelCatalogResolver {
    pub fn new(api: Arc<dyn ControlApi>) -> Self {
        let (models, _rx) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(ResolverInner {
                api,
                started: AtomicBool::new(false),
                models,
            }),
        }
    }

    /// Resolve in the background on first activation. Requires a Tokio runtime.
    pub fn activate(&self) {
        if self.inner.started.load(Ordering::SeqCst) {
            return;
        }
        let resolver = self.clone();
        tokio::spawn(async move {
            resolver.resolve().await;
        });
    }

    /// Fetch the model list unless a fetch was already started.
    /// Returns whether this call did the fetch.
    pub async fn resolve(&self) -> bool {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return false;
        }

        match self.inner.api.list_models().await {
            Ok(models) => {
                tracing::info!("Backend reports {} model file(s)", models.len());
                self.inner.models.send_replace(models);
            }
            Err(e) => {
                tracing::warn!("Could not list models, manual entry only: {}", e);
            }
        }
        true
    }

    pub fn models(&self) -> Vec<String> {
        self.inner.models.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.inner.models.subscribe()
    }
}

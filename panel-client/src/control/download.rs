//! Model download requests.

use std::sync::Arc;

use panel_common::{find_entry, DownloadModelRequest, ModelCatalogEntry, DEFAULT_MODEL};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::gateway::ControlApi;

/// Download form: a URL field plus an optional catalog selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadForm {
    /// The visible URL field.
    pub url: String,
    pub selected: Option<&'static ModelCatalogEntry>,
}

impl DownloadForm {
    /// Payload for the current form: the catalog entry when one is selected,
    /// otherwise the free-text URL alone.
    pub fn request(&self) -> DownloadModelRequest {
        match self.selected {
            Some(entry) => DownloadModelRequest {
                url: entry.url.to_string(),
                filename: Some(entry.filename.to_string()),
            },
            None => DownloadModelRequest {
                url: self.url.clone(),
                filename: None,
            },
        }
    }
}

/// Submits model downloads to the backend.
pub struct ModelDownloadController {
    api: Arc<dyn ControlApi>,
    form: watch::Sender<DownloadForm>,
}

impl ModelDownloadController {
    pub fn new(api: Arc<dyn ControlApi>) -> Self {
        let (form, _rx) = watch::channel(DownloadForm::default());
        Self { api, form }
    }

    pub fn form(&self) -> DownloadForm {
        self.form.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadForm> {
        self.form.subscribe()
    }

    /// Select a predefined entry by name. Overwrites the URL field.
    pub fn select(&self, name: &str) -> Result<&'static ModelCatalogEntry> {
        let entry = find_entry(name).ok_or_else(|| Error::UnknownCatalogEntry(name.to_string()))?;
        self.form.send_modify(|form| {
            form.selected = Some(entry);
            form.url = entry.url.to_string();
        });
        Ok(entry)
    }

    /// Back to free-text mode; the URL field is left as is.
    pub fn clear_selection(&self) {
        self.form.send_modify(|form| form.selected = None);
    }

    /// Edit the URL field. Does not affect the selection.
    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.form.send_modify(|form| form.url = url);
    }

    /// Ask the backend to fetch the model. Returns the operator message.
    pub async fn download(&self) -> Result<String> {
        let request = self.form.borrow().request();
        tracing::info!(url = %request.url, filename = ?request.filename, "Requesting model download");

        self.api.download_model(&request).await.map_err(|e| {
            tracing::error!("Failed to download model: {}", e);
            e
        })?;

        let saved_as = request.filename.as_deref().unwrap_or(DEFAULT_MODEL);
        Ok(format!("Model downloaded successfully as \"{}\"!", saved_as))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{FakeApi, Reply};

    fn setup() -> (Arc<FakeApi>, ModelDownloadController) {
        let api = Arc::new(FakeApi::new());
        let controller = ModelDownloadController::new(api.clone());
        (api, controller)
    }

    #[tokio::test]
    async fn test_catalog_selection_sends_filename() {
        let (api, controller) = setup();
        api.download.push(Reply::Ok(()));

        let entry = controller.select("Qwen 2.5 3B").unwrap();
        assert_eq!(controller.form().url, entry.url);

        let message = controller.download().await.unwrap();

        let sent = api.download_requests.lock().unwrap()[0].clone();
        assert_eq!(sent.url, entry.url);
        assert_eq!(sent.filename.as_deref(), Some("qwen2.5-3b"));
        assert_eq!(message, "Model downloaded successfully as \"qwen2.5-3b\"!");
    }

    #[tokio::test]
    async fn test_free_text_sends_url_only() {
        let (api, controller) = setup();
        api.download.push(Reply::Ok(()));

        controller.set_url("https://example.com/custom.gguf");
        let message = controller.download().await.unwrap();

        let sent = api.download_requests.lock().unwrap()[0].clone();
        assert_eq!(sent.url, "https://example.com/custom.gguf");
        assert_eq!(sent.filename, None);
        assert_eq!(message, "Model downloaded successfully as \"model\"!");
    }

    #[test]
    fn test_selection_overwrites_url_but_not_vice_versa() {
        let (_, controller) = setup();
        controller.set_url("https://example.com/typed.gguf");

        let entry = controller.select("Llama 3.2 1B").unwrap();
        assert_eq!(controller.form().url, entry.url);

        controller.set_url("https://example.com/edited.gguf");
        let form = controller.form();
        assert_eq!(form.selected, Some(entry));
        assert_eq!(form.request().url, entry.url);
    }

    #[test]
    fn test_clear_selection_keeps_url() {
        let (_, controller) = setup();
        let entry = controller.select("Gemma 2 9B it").unwrap();

        controller.clear_selection();
        let form = controller.form();
        assert!(form.selected.is_none());
        assert_eq!(form.url, entry.url);
        assert_eq!(form.request().filename, None);
    }

    #[test]
    fn test_unknown_entry() {
        let (_, controller) = setup();
        assert!(matches!(
            controller.select("Mystery 70B"),
            Err(Error::UnknownCatalogEntry(_))
        ));
        assert!(controller.form().selected.is_none());
    }

    #[tokio::test]
    async fn test_backend_failure_reported() {
        let (api, controller) = setup();
        api.download.push(Reply::Rejected(400, "Failed to download model."));
        controller.set_url("https://example.com/missing.gguf");

        let err = controller.download().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to download model.");
    }
}

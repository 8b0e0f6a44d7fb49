use playbook_core::completion::CancelToken;
use playbook_core::validation::ValidationCache;
use playbook_core::WorkspaceManager;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// Global state for LSP server
/// Must be Send + Sync
#[derive(Clone)]
pub struct GlobalState {
    /// Folder routing and per-folder contexts.
    /// Requests only read; folder and settings changes write.
    pub workspace: Arc<RwLock<WorkspaceManager>>,

    /// Text of every open document
    pub documents: Arc<RwLock<HashMap<Url, String>>>,

    /// Last full-pass diagnostics and the files each document published to
    pub validation: Arc<std::sync::Mutex<ValidationCache>>,

    /// Cancellation token of the pending completion per document
    pub completions: Arc<std::sync::Mutex<HashMap<Url, CancelToken>>>,

    /// Set once the client announced work-done progress support
    pub progress_supported: Arc<AtomicBool>,
}

impl GlobalState {
    pub fn new(workspace: WorkspaceManager, progress_supported: Arc<AtomicBool>) -> Self {
        Self {
            workspace: Arc::new(RwLock::new(workspace)),
            documents: Arc::new(RwLock::new(HashMap::new())),
            validation: Arc::new(std::sync::Mutex::new(ValidationCache::new())),
            completions: Arc::new(std::sync::Mutex::new(HashMap::new())),
            progress_supported,
        }
    }

    pub fn set_progress_supported(&self, supported: bool) {
        self.progress_supported.store(supported, Ordering::SeqCst);
    }

    pub async fn document_text(&self, uri: &Url) -> Option<String> {
        self.documents.read().await.get(uri).cloned()
    }
}

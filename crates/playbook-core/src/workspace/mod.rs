//! Workspace folders and the per-folder service registry.

mod folder;

pub use folder::{FolderContext, Services};

use crate::config::Settings;
use crate::model::{FileEvent, WorkspaceFolder};
use crate::utils::uri_to_path;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// Routes documents to the innermost workspace folder containing them and owns
/// one [`FolderContext`] per folder.
pub struct WorkspaceManager {
    services: Services,
    settings: Settings,
    /// Longest URI first, so nested folders match before their parents.
    folders: Vec<WorkspaceFolder>,
    contexts: Mutex<HashMap<Url, Arc<FolderContext>>>,
}

impl WorkspaceManager {
    pub fn new(services: Services, settings: Settings) -> Self {
        Self {
            services,
            settings,
            folders: Vec::new(),
            contexts: Mutex::new(HashMap::new()),
        }
    }

    pub fn folders(&self) -> &[WorkspaceFolder] {
        &self.folders
    }

    pub fn set_folders(&mut self, folders: Vec<WorkspaceFolder>) {
        self.folders = folders;
        self.sort_folders();
    }

    fn sort_folders(&mut self) {
        self.folders
            .sort_by(|a, b| b.uri.as_str().len().cmp(&a.uri.as_str().len()));
    }

    /// Innermost folder containing `uri`. A document outside every folder is
    /// served by a folder for its own directory.
    pub fn get_folder(&self, uri: &Url) -> Option<WorkspaceFolder> {
        if let Some(folder) = self.folders.iter().find(|f| f.contains(uri)) {
            return Some(folder.clone());
        }
        let dir = uri_to_path(uri).parent()?.to_path_buf();
        let dir_uri = Url::from_file_path(&dir).ok()?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(WorkspaceFolder::new(dir_uri, name))
    }

    /// Context of the folder serving `uri`, created on first use.
    pub fn get_context(&self, uri: &Url) -> Option<Arc<FolderContext>> {
        let folder = self.get_folder(uri)?;
        let mut contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        let context = contexts.entry(folder.uri.clone()).or_insert_with(|| {
            log::info!("Creating context for folder {}", folder.uri);
            Arc::new(FolderContext::new(folder, self.services.clone(), self.settings.clone()))
        });
        Some(Arc::clone(context))
    }

    /// Apply a folder change notification. Contexts of removed folders are
    /// dropped so a re-added folder starts from scratch.
    pub fn handle_folder_changes(&mut self, added: Vec<WorkspaceFolder>, removed: &[WorkspaceFolder]) {
        {
            let mut contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
            for folder in removed {
                contexts.remove(&folder.uri);
            }
        }
        self.folders.retain(|f| !removed.iter().any(|r| r.uri == f.uri));
        for folder in added {
            if !self.folders.iter().any(|f| f.uri == folder.uri) {
                self.folders.push(folder);
            }
        }
        self.sort_folders();
    }

    /// New settings for every folder, existing and future.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
        for context in self.contexts() {
            context.update_settings(self.settings.clone());
        }
    }

    pub fn handle_file_events(&self, events: &[FileEvent]) {
        for context in self.contexts() {
            context.handle_file_events(events);
        }
    }

    pub fn contexts(&self) -> Vec<Arc<FolderContext>> {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

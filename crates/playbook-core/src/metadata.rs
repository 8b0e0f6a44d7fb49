//! Collections attached to role task files through the role's `meta/main.yml`.

use crate::model::FileEvent;
use crate::utils::uri_to_path;
use crate::vfs::FileSystem;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentMetadata {
    pub source: PathBuf,
    pub collections: Vec<String>,
}

/// The `meta/main.yml` that belongs to a file below a `tasks` directory.
pub fn meta_path_for(path: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    let index = components
        .iter()
        .position(|c| c.as_os_str() == "tasks")?;
    let mut meta: PathBuf = components[..index].iter().collect();
    meta.push("meta");
    meta.push("main.yml");
    Some(meta)
}

fn parse_metadata(source: &Path, contents: &str) -> DocumentMetadata {
    let mut collections = Vec::new();
    for document in serde_yaml::Deserializer::from_str(contents) {
        match serde_yaml::Value::deserialize(document) {
            Ok(value) => {
                if let Some(list) = value.get("collections").and_then(|c| c.as_sequence()) {
                    collections.extend(list.iter().filter_map(|c| c.as_str().map(str::to_string)));
                }
            }
            Err(e) => {
                log::warn!("Invalid metadata in {}: {e}", source.display());
                break;
            }
        }
    }
    DocumentMetadata {
        source: source.to_path_buf(),
        collections,
    }
}

/// Per-folder cache of role metadata, keyed by metadata file.
pub struct MetadataIndex {
    fs: Arc<dyn FileSystem>,
    cache: Mutex<HashMap<PathBuf, Arc<DocumentMetadata>>>,
}

impl MetadataIndex {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Metadata of the role `uri` belongs to; `None` outside a `tasks` directory.
    pub fn get(&self, uri: &Url) -> Option<Arc<DocumentMetadata>> {
        let meta_path = meta_path_for(&uri_to_path(uri))?;
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let metadata = cache.entry(meta_path.clone()).or_insert_with(|| {
            let metadata = match self.fs.read_to_string(&meta_path) {
                Ok(contents) => parse_metadata(&meta_path, &contents),
                Err(_) => DocumentMetadata {
                    source: meta_path.clone(),
                    collections: Vec::new(),
                },
            };
            Arc::new(metadata)
        });
        Some(Arc::clone(metadata))
    }

    pub fn collections_for(&self, uri: &Url) -> Vec<String> {
        self.get(uri)
            .map(|m| m.collections.clone())
            .unwrap_or_default()
    }

    /// Drop cached entries for every changed file.
    pub fn handle_file_events(&self, events: &[FileEvent]) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        for event in events {
            cache.remove(&uri_to_path(&event.uri));
        }
    }
}

//! Locates module sources and plugin routing files on disk.

use super::model::{ModuleDoc, PluginRoute};
use crate::error::DocsError;
use crate::vfs::FileSystem;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// An indexed module; its documentation is parsed on first use.
#[derive(Debug)]
pub struct ModuleEntry {
    pub fqcn: String,
    pub namespace: String,
    pub collection: String,
    pub name: String,
    pub source: PathBuf,
    doc: OnceLock<Option<Arc<ModuleDoc>>>,
}

impl ModuleEntry {
    pub fn new(namespace: &str, collection: &str, name: &str, source: PathBuf) -> Self {
        Self {
            fqcn: format!("{namespace}.{collection}.{name}"),
            namespace: namespace.to_string(),
            collection: collection.to_string(),
            name: name.to_string(),
            source,
            doc: OnceLock::new(),
        }
    }

    /// Entry whose documentation is already known.
    pub fn with_documentation(namespace: &str, collection: &str, name: &str, doc: ModuleDoc) -> Self {
        let entry = Self::new(namespace, collection, name, PathBuf::new());
        let _ = entry.doc.set(Some(Arc::new(doc)));
        entry
    }

    pub fn documentation(&self, fs: &dyn FileSystem) -> Option<Arc<ModuleDoc>> {
        self.doc
            .get_or_init(|| match load_documentation(fs, &self.source) {
                Ok(doc) => doc.map(Arc::new),
                Err(e) => {
                    log::warn!("{e}");
                    None
                }
            })
            .clone()
    }
}

fn docs_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)DOCUMENTATION\s*=\s*r?(?:'''(?P<single>.*?)'''|"""(?P<double>.*?)""")"#).ok()
    })
    .as_ref()
}

/// The YAML text of the `DOCUMENTATION` string in a module source.
pub fn extract_documentation(source: &str) -> Option<&str> {
    let caps = docs_regex()?.captures(source)?;
    let body = caps.name("single").or_else(|| caps.name("double"))?.as_str();
    let body = body.strip_prefix('\n').unwrap_or(body);
    Some(body.strip_prefix("---\n").unwrap_or(body))
}

fn load_documentation(fs: &dyn FileSystem, path: &Path) -> Result<Option<ModuleDoc>, DocsError> {
    let contents = fs.read_to_string(path).map_err(|source| DocsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let body = extract_documentation(&contents)
        .ok_or_else(|| DocsError::MissingDocumentation(path.to_path_buf()))?;
    let raw: serde_yaml::Value = serde_yaml::from_str(body).map_err(|source| DocsError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ModuleDoc::from_raw(&raw))
}

fn is_module_source(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('_'))
}

fn stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Builtin modules below a module search path.
pub fn find_builtin_modules(fs: &dyn FileSystem, dir: &Path) -> Vec<ModuleEntry> {
    fs.list_files(dir, "py")
        .into_iter()
        .filter(|p| is_module_source(p))
        .filter_map(|p| {
            let name = stem(&p)?.to_string();
            Some(ModuleEntry::new("ansible", "builtin", &name, p))
        })
        .collect()
}

fn collection_dirs(fs: &dyn FileSystem, collections_path: &Path) -> Vec<(String, String, PathBuf)> {
    let mut dirs = Vec::new();
    for namespace_dir in fs.list_dirs(&collections_path.join("ansible_collections")) {
        let Some(namespace) = namespace_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        for collection_dir in fs.list_dirs(&namespace_dir) {
            let Some(collection) = collection_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            dirs.push((namespace.to_string(), collection.to_string(), collection_dir.clone()));
        }
    }
    dirs
}

/// Modules of every collection installed below `collections_path`.
pub fn find_collection_modules(fs: &dyn FileSystem, collections_path: &Path) -> Vec<ModuleEntry> {
    let mut entries = Vec::new();
    for (namespace, collection, dir) in collection_dirs(fs, collections_path) {
        for path in fs.list_files(&dir.join("plugins").join("modules"), "py") {
            if !is_module_source(&path) {
                continue;
            }
            if let Some(name) = stem(&path).map(str::to_string) {
                entries.push(ModuleEntry::new(&namespace, &collection, &name, path));
            }
        }
    }
    entries
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuntimeFile {
    plugin_routing: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
}

/// Module routes declared in a runtime metadata file.
pub fn parse_routing(contents: &str) -> BTreeMap<String, PluginRoute> {
    let runtime: RuntimeFile = match serde_yaml::from_str(contents) {
        Ok(runtime) => runtime,
        Err(e) => {
            log::warn!("Invalid plugin routing: {e}");
            return BTreeMap::new();
        }
    };
    runtime
        .plugin_routing
        .get("modules")
        .map(|routes| {
            routes
                .iter()
                .filter_map(|(name, raw)| {
                    serde_yaml::from_value::<PluginRoute>(raw.clone())
                        .ok()
                        .map(|route| (name.clone(), route))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub type RoutingByCollection = BTreeMap<String, BTreeMap<String, PluginRoute>>;

/// Routing of the builtin collection, shipped with the tool's python package.
pub fn find_builtin_routing(fs: &dyn FileSystem, ansible_location: &Path) -> RoutingByCollection {
    let file = ansible_location.join("config").join("ansible_builtin_runtime.yml");
    let mut routing = RoutingByCollection::new();
    if let Ok(contents) = fs.read_to_string(&file) {
        routing.insert("ansible.builtin".to_string(), parse_routing(&contents));
    }
    routing
}

/// Routing of every collection installed below `collections_path`.
pub fn find_collection_routing(fs: &dyn FileSystem, collections_path: &Path) -> RoutingByCollection {
    let mut routing = RoutingByCollection::new();
    for (namespace, collection, dir) in collection_dirs(fs, collections_path) {
        let file = dir.join("meta").join("runtime.yml");
        if let Ok(contents) = fs.read_to_string(&file) {
            routing.insert(format!("{namespace}.{collection}"), parse_routing(&contents));
        }
    }
    routing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_documentation_both_quote_styles() {
        let single = "DOCUMENTATION = r'''\n---\nmodule: ping\n'''\nEXAMPLES = '''x'''";
        assert_eq!(extract_documentation(single), Some("module: ping\n"));
        let double = "DOCUMENTATION = \"\"\"\nmodule: copy\n\"\"\"";
        assert_eq!(extract_documentation(double), Some("module: copy\n"));
        assert_eq!(extract_documentation("print('hi')"), None);
    }

    #[test]
    fn test_parse_routing() {
        let routes = parse_routing(
            "
plugin_routing:
  modules:
    old_ping:
      redirect: ns.coll.ping
    gone:
      tombstone:
        removal_version: '2.0'
        warning_text: use ping
  lookup:
    ignored:
      redirect: x.y.z
",
        );
        assert_eq!(routes.len(), 2);
        assert_eq!(routes["old_ping"].redirect.as_deref(), Some("ns.coll.ping"));
        assert_eq!(
            routes["gone"].tombstone.as_ref().and_then(|t| t.warning_text.as_deref()),
            Some("use ping")
        );
    }
}

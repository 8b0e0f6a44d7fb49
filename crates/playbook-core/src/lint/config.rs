use crate::error::LintError;
use crate::model::FileEvent;
use crate::utils::uri_to_path;
use crate::vfs::FileSystem;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

const CONFIG_FILE_NAMES: &[&str] = &[".ansible-lint", ".ansible-lint.yml", ".ansible-lint.yaml"];

/// The parts of a lint configuration file the validator uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintConfig {
    /// Rule names and categories reported as warnings.
    pub warn_list: BTreeSet<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLintConfig {
    #[serde(default)]
    warn_list: Vec<serde_yaml::Value>,
}

impl LintConfig {
    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        let mut config = LintConfig::default();
        for document in serde_yaml::Deserializer::from_str(contents) {
            let raw = Option::<RawLintConfig>::deserialize(document)?.unwrap_or_default();
            config
                .warn_list
                .extend(raw.warn_list.iter().filter_map(|v| v.as_str().map(str::to_string)));
        }
        Ok(config)
    }
}

fn config_arg_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:^|\s)-c\s*(?:"([^"]+)"|'([^']+)'|(\S+))"#).ok())
        .as_ref()
}

/// Config file named with `-c` in the user's lint arguments.
pub fn config_from_arguments(arguments: &str) -> Option<String> {
    let caps = config_arg_regex()?.captures(arguments)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_string())
}

/// Nearest config file in the directories from `doc_path` up to `folder_root`.
pub fn find_config_file(fs: &dyn FileSystem, doc_path: &Path, folder_root: &Path) -> Option<PathBuf> {
    let mut dir = doc_path.parent();
    while let Some(current) = dir {
        if !current.starts_with(folder_root) {
            break;
        }
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if fs.exists(&candidate) {
                return Some(candidate);
            }
        }
        dir = current.parent();
    }
    None
}

/// Parsed lint configs by absolute path.
pub struct LintConfigCache {
    fs: Arc<dyn FileSystem>,
    entries: Mutex<HashMap<PathBuf, Arc<LintConfig>>>,
}

impl LintConfigCache {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The config at `path`. A file that cannot be read or parsed is cached as
    /// an empty config and the error is returned alongside it, once.
    pub fn get(&self, path: &Path) -> (Arc<LintConfig>, Option<LintError>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = entries.get(path) {
            return (Arc::clone(config), None);
        }
        let loaded = self
            .fs
            .read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| LintConfig::parse(&contents).map_err(|e| e.to_string()));
        let (config, error) = match loaded {
            Ok(config) => (Arc::new(config), None),
            Err(reason) => (
                Arc::new(LintConfig::default()),
                Some(LintError::Config {
                    path: path.to_path_buf(),
                    reason,
                }),
            ),
        };
        entries.insert(path.to_path_buf(), Arc::clone(&config));
        (config, error)
    }

    pub fn handle_file_events(&self, events: &[FileEvent]) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for event in events {
            entries.remove(&uri_to_path(&event.uri));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileChangeKind;
    use crate::vfs::PhysicalFileSystem;
    use tempfile::TempDir;
    use url::Url;

    #[test]
    fn test_config_from_arguments() {
        assert_eq!(config_from_arguments("-c custom.yml -x y").as_deref(), Some("custom.yml"));
        assert_eq!(
            config_from_arguments("--profile min -c \"/a b/lint.yml\"").as_deref(),
            Some("/a b/lint.yml")
        );
        assert_eq!(config_from_arguments("-c'q.yml'").as_deref(), Some("q.yml"));
        assert_eq!(config_from_arguments("--strict --config-only"), None);
    }

    #[test]
    fn test_find_config_file_stops_at_folder() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("project");
        std::fs::create_dir_all(folder.join("roles/web/tasks")).unwrap();
        std::fs::write(dir.path().join(".ansible-lint"), "warn_list: []\n").unwrap();
        let doc = folder.join("roles/web/tasks/main.yml");

        let fs = PhysicalFileSystem;
        assert_eq!(find_config_file(&fs, &doc, &folder), None);

        std::fs::write(folder.join("roles/.ansible-lint"), "warn_list: []\n").unwrap();
        assert_eq!(find_config_file(&fs, &doc, &folder), Some(folder.join("roles/.ansible-lint")));
    }

    #[test]
    fn test_cache_reloads_after_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ansible-lint");
        std::fs::write(&path, "warn_list:\n  - experimental\n").unwrap();
        let cache = LintConfigCache::new(Arc::new(PhysicalFileSystem));

        let (config, error) = cache.get(&path);
        assert!(error.is_none());
        assert!(config.warn_list.contains("experimental"));

        std::fs::write(&path, "warn_list: [yaml]\n").unwrap();
        assert!(cache.get(&path).0.warn_list.contains("experimental"));
        cache.handle_file_events(&[FileEvent {
            uri: Url::from_file_path(&path).unwrap(),
            kind: FileChangeKind::Changed,
        }]);
        assert!(cache.get(&path).0.warn_list.contains("yaml"));
    }

    #[test]
    fn test_broken_config_is_empty_and_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ansible-lint");
        std::fs::write(&path, "warn_list: [unclosed\n").unwrap();
        let cache = LintConfigCache::new(Arc::new(PhysicalFileSystem));

        let (config, error) = cache.get(&path);
        assert!(config.warn_list.is_empty());
        assert!(matches!(error, Some(LintError::Config { .. })));
        assert!(cache.get(&path).1.is_none());
    }
}

use std::path::{Path, PathBuf};
use url::Url;

/// Expand a leading `~/` or `$HOME/` to the user's home directory.
///
/// # Examples
///
/// ```
/// use playbook_core::expand_path;
///
/// assert_eq!(expand_path("*/x"), "*/x");
/// assert_eq!(expand_path("/opt/venv"), "/opt/venv");
/// ```
pub fn expand_path(path: &str) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.to_string();
    };
    for prefix in ["~/", "$HOME/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    if path == "~" || path == "$HOME" {
        return home.to_string_lossy().to_string();
    }
    path.to_string()
}

/// Replace every character outside `[a-z0-9]` (case-insensitive) with `_`.
///
/// # Examples
///
/// ```
/// use playbook_core::utils::sanitize_name;
///
/// assert_eq!(
///     sanitize_name("ghcr.io/ansible/creator-ee:latest"),
///     "ghcr_io_ansible_creator_ee_latest"
/// );
/// ```
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Parse a Python list literal of strings such as `['/a', "/b"]`.
///
/// Single quotes are rewritten to double quotes and the result is read as
/// JSON, so separators inside an element are kept. Unparseable input yields
/// an empty list.
pub fn parse_python_string_array(text: &str) -> Vec<String> {
    let json = text.trim().replace('\'', "\"");
    match serde_json::from_str::<Vec<String>>(&json) {
        Ok(items) => items.into_iter().filter(|item| !item.is_empty()).collect(),
        Err(e) => {
            log::debug!("Cannot parse string list {text:?}: {e}");
            Vec::new()
        }
    }
}

/// Quote a path for a `sh -c` command line.
pub fn quote(path: &Path) -> String {
    format!("\"{}\"", path.to_string_lossy().replace('"', "\\\""))
}

pub fn uri_to_path(uri: &Url) -> PathBuf {
    uri.to_file_path()
        .unwrap_or_else(|_| PathBuf::from(uri.path()))
}

pub fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

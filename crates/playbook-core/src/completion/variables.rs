//! Variables visible from inside a `{{ ... }}` template expression.

use super::Prepared;
use crate::ansible::is_play_param;
use crate::syntax::{Document, Expect, NodeId, Path};
use crate::utils::uri_to_path;
use crate::vfs::FileSystem;
use std::path::Path as FsPath;
use url::Url;

/// Whether the cursor sits between `{{` and `}}` of one expression on its line.
pub(crate) fn inside_template(prepared: &Prepared<'_>, path: &Path<'_>) -> bool {
    let Some(value) = path.last_node().and_then(|n| path.doc().scalar(n)) else {
        return false;
    };
    if !value.contains("{{") {
        return false;
    }
    let (before, after) = prepared.line_around_cursor();
    let Some(open) = before.rfind("{{") else {
        return false;
    };
    if before[open..].contains("}}") {
        return false;
    }
    match (after.find("}}"), after.find("{{")) {
        (Some(close), Some(next_open)) => close < next_open,
        (Some(_), None) => true,
        _ => false,
    }
}

fn mapping_keys(doc: &Document, node: NodeId) -> Vec<String> {
    if doc.is_mapping(node) {
        return doc.keys(node).into_iter().map(str::to_string).collect();
    }
    doc.items(node)
        .iter()
        .flat_map(|&item| doc.keys(item))
        .map(str::to_string)
        .collect()
}

/// Keys of the `vars` of the mapping owning the key at the end of `key_path`.
fn scoped_vars(key_path: &Path<'_>) -> Vec<String> {
    let doc = key_path.doc();
    key_path
        .ancestry()
        .parent_of_key()
        .node()
        .and_then(|map| doc.get(map, "vars"))
        .map(|vars| mapping_keys(doc, vars))
        .unwrap_or_default()
}

/// Path to the key of the next enclosing mapping entry: through a mapping
/// value first, then through a sequence item.
fn enclosing_key_path<'d>(path: &Path<'d>) -> Option<Path<'d>> {
    let through_map = path
        .ancestry()
        .parent(Some(Expect::Mapping))
        .parent(Some(Expect::Mapping))
        .key_path();
    if let Some(parent) = through_map.filter(|p| p.key_name().is_some()) {
        return Some(parent);
    }
    path.ancestry()
        .parent(Some(Expect::Mapping))
        .parent(Some(Expect::Sequence))
        .parent(Some(Expect::Mapping))
        .key_path()
        .filter(|p| p.key_name().is_some())
}

fn vars_file_keys(fs: &dyn FileSystem, file: &FsPath) -> Vec<String> {
    let Ok(contents) = fs.read_to_string(file) else {
        return Vec::new();
    };
    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(&contents) else {
        log::debug!("Ignoring unreadable vars file {}", file.display());
        return Vec::new();
    };
    let keys_of = |v: &serde_yaml::Value| -> Vec<String> {
        v.as_mapping()
            .map(|m| m.keys().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };
    match &value {
        serde_yaml::Value::Sequence(items) => items.iter().flat_map(keys_of).collect(),
        other => keys_of(other),
    }
}

/// `(variable, scope)` pairs visible at `path`, innermost scope first: task,
/// block and play `vars`, then `vars_prompt`, then `vars_files`.
pub(crate) fn collect(path: &Path<'_>, uri: &Url, fs: &dyn FileSystem) -> Vec<(String, u8)> {
    let mut variables = Vec::new();
    let mut scope: u8 = 0;
    let mut current = path.clone();

    while is_play_param(&current, None) != Some(true) {
        let Some(parent) = enclosing_key_path(&current) else {
            break;
        };
        scope = scope.saturating_add(1);
        variables.extend(scoped_vars(&parent).into_iter().map(|v| (v, scope)));
        current = parent;
    }

    let doc = current.doc();
    let Some(play) = current.ancestry().parent_of_key().node() else {
        return variables;
    };

    scope = scope.saturating_add(1);
    if let Some(prompts) = doc.get(play, "vars_prompt") {
        for &prompt in doc.items(prompts) {
            if let Some(name) = doc.get(prompt, "name").and_then(|n| doc.scalar(n)) {
                variables.push((name.to_string(), scope));
            }
        }
    }

    scope = scope.saturating_add(1);
    if let Some(files) = doc.get(play, "vars_files") {
        let doc_path = uri_to_path(uri);
        let base = doc_path.parent().unwrap_or(FsPath::new("/"));
        for &file in doc.items(files) {
            let Some(name) = doc.scalar(file) else { continue };
            let file = base.join(name);
            variables.extend(vars_file_keys(fs, &file).into_iter().map(|v| (v, scope)));
        }
    }
    variables
}

//! Predicates that classify where a cursor path sits inside a playbook.

use super::keywords::{
    is_task_keyword, play_exclusive_keywords, play_without_task_keywords, TASK_LIST_KEYS,
};
use crate::syntax::{Document, Expect, NodeId, ParsedDocument, Path};

/// How a suboption is nested under its parent option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Dict,
    List,
}

impl TraceKind {
    /// Option type name this nesting corresponds to.
    pub fn type_name(self) -> &'static str {
        match self {
            TraceKind::Dict => "dict",
            TraceKind::List => "list",
        }
    }
}

fn is_role_tasks_file(uri: &str) -> bool {
    let mut parts = uri.split('/');
    while let Some(part) = parts.next() {
        if part == "roles" {
            let mut rest = parts.clone();
            if let (Some(name), Some("tasks"), Some(_)) = (rest.next(), rest.next(), rest.next()) {
                if !name.is_empty() {
                    return true;
                }
            }
        }
    }
    false
}

/// Whether the key at the end of `path` is a play keyword.
///
/// `None` means the answer cannot be decided from the document alone: the key
/// sits in a top-level mapping that has no play-only keys yet.
pub fn is_play_param(path: &Path<'_>, file_uri: Option<&str>) -> Option<bool> {
    let map = path.ancestry().parent_of_key();
    let at_root = map.parent(Some(Expect::Sequence)).path().map(|p| p.len()) == Some(1);
    if !at_root {
        return Some(false);
    }
    let doc = path.doc();
    let map_node = map.node()?;
    if doc
        .keys(map_node)
        .iter()
        .any(|k| play_exclusive_keywords().contains(k))
    {
        return Some(true);
    }
    match file_uri {
        Some(uri) if is_role_tasks_file(uri) => Some(false),
        _ => None,
    }
}

/// Whether the key at the end of `path` belongs to a block.
pub fn is_block_param(path: &Path<'_>) -> bool {
    let map = path.ancestry().parent_of_key();
    let in_sequence = map.parent(Some(Expect::Sequence)).node().is_some();
    match map.node() {
        Some(node) if in_sequence && path.doc().is_mapping(node) => {
            path.doc().keys(node).contains(&"block")
        }
        _ => false,
    }
}

/// Whether the key at the end of `path` belongs to an entry of a `roles` list.
pub fn is_role_param(path: &Path<'_>) -> bool {
    path.ancestry()
        .parent_of_key()
        .parent(Some(Expect::Sequence))
        .parent(Some(Expect::Mapping))
        .string_key()
        == Some("roles")
}

/// Whether the key at the end of `path` belongs to a task.
pub fn is_task_param(path: &Path<'_>) -> bool {
    let Some(task_list) = path
        .ancestry()
        .parent_of_key()
        .parent(Some(Expect::Sequence))
        .path()
    else {
        return false;
    };
    if is_play_param(path, None) == Some(true) || is_block_param(path) || is_role_param(path) {
        return false;
    }
    if task_list.len() == 1 {
        return true;
    }
    task_list
        .ancestry()
        .parent(Some(Expect::Mapping))
        .string_key()
        .is_some_and(|key| TASK_LIST_KEYS.contains(&key))
}

/// Walk up from an option key to the task parameter that owns it.
///
/// Returns the path to the task parameter key (the module name or `args`)
/// together with the keys passed on the way, innermost first. `None` when the
/// path does not lead to a task.
pub fn task_param_path_with_trace<'d>(path: &Path<'d>) -> Option<(Path<'d>, Vec<(String, TraceKind)>)> {
    let mut trace = Vec::new();
    let mut current = path.clone();
    while !is_task_param(&current) {
        let doc = current.doc();
        let as_dict = current
            .ancestry()
            .parent_of_key()
            .parent(Some(Expect::Mapping))
            .key_path();
        if let Some(parent) = as_dict {
            if let Some(key) = parent.last_node().and_then(|k| doc.scalar(k)) {
                trace.push((key.to_string(), TraceKind::Dict));
                current = parent;
                continue;
            }
        }
        let as_list = current
            .ancestry()
            .parent_of_key()
            .parent(Some(Expect::Sequence))
            .parent(Some(Expect::Mapping))
            .key_path();
        if let Some(parent) = as_list {
            if let Some(key) = parent.last_node().and_then(|k| doc.scalar(k)) {
                trace.push((key.to_string(), TraceKind::List));
                current = parent;
                continue;
            }
        }
        return None;
    }
    Some((current, trace))
}

fn collections_of(doc: &Document, map: Option<NodeId>) -> Vec<String> {
    let Some(list) = map.and_then(|m| doc.get(m, "collections")) else {
        return Vec::new();
    };
    doc.items(list)
        .iter()
        .filter_map(|&item| doc.scalar(item))
        .map(str::to_string)
        .collect()
}

/// Collections declared by the task that owns the module key at the end of
/// `module_path`, its enclosing blocks and the play.
pub fn declared_collections(module_path: &Path<'_>) -> Vec<String> {
    let doc = module_path.doc();
    let mut declared = Vec::new();
    let task_map = module_path
        .len()
        .checked_sub(3)
        .and_then(|i| module_path.get(i))
        .and_then(|s| s.node());
    declared.extend(collections_of(doc, task_map));

    let Some(mut current) = module_path.ancestry().parent(Some(Expect::Mapping)).path() else {
        return declared;
    };
    loop {
        let up = current
            .ancestry()
            .parent(Some(Expect::Sequence))
            .parent(Some(Expect::Mapping));
        match (up.string_key(), up.path()) {
            (Some("block" | "rescue" | "always"), Some(block)) => {
                declared.extend(collections_of(doc, up.node()));
                current = block;
            }
            _ => break,
        }
    }
    let play = current
        .ancestry()
        .parent(Some(Expect::Sequence))
        .parent(Some(Expect::Mapping))
        .node();
    declared.extend(collections_of(doc, play));
    declared
}

/// Task parameters given in the task mapping that owns `task_param_path`, with
/// keywords filtered out. Usually zero or one module name.
pub fn provided_module_names<'d>(task_param_path: &Path<'d>) -> Vec<&'d str> {
    let doc = task_param_path.doc();
    let Some(map) = task_param_path.ancestry().parent(Some(Expect::Mapping)).node() else {
        return Vec::new();
    };
    doc.keys(map)
        .into_iter()
        .filter(|k| !is_task_keyword(k))
        .collect()
}

/// Whether the text looks like a playbook: the first document is a list in
/// which some entry carries a play keyword.
pub fn is_playbook(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    let parsed = ParsedDocument::parse(text);
    let Some(doc) = parsed.documents.first() else {
        return false;
    };
    let Some(root) = doc.root() else {
        return false;
    };
    if !doc.is_sequence(root) {
        return false;
    }
    doc.items(root).iter().any(|&item| {
        doc.keys(item).iter().any(|k| {
            play_without_task_keywords().contains(k)
                || matches!(*k, "import_playbook" | "ansible.builtin.import_playbook")
        })
    })
}

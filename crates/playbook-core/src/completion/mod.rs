//! Completion of keywords, modules, module options, option values and
//! template variables at a cursor position.

mod candidates;
mod variables;

#[cfg(test)]
mod tests;

pub use candidates::{insertion_suffix, module_documentation};

use crate::ansible::{
    is_block_param, is_play_param, is_playbook, is_role_param, is_task_param, task_param_path_with_trace,
    TraceKind,
};
use crate::config::Settings;
use crate::docs::{DocsLibrary, OptionSet};
use crate::line_map::LineMap;
use crate::model::{Point, TextRange};
use crate::syntax::{path_at, Expect, ParsedDocument, Path};
use crate::vfs::FileSystem;
use crate::workspace::FolderContext;
use candidates::CandidateList;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Keyword,
    Module,
    RedirectedModule,
    Option,
    Alias,
    Value,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: TextRange,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCandidate {
    pub label: String,
    pub kind: CandidateKind,
    /// Lower ranks first.
    pub priority: u8,
    /// Position in document or schema order within the candidate list.
    pub order: usize,
    pub detail: Option<String>,
    pub documentation: Option<String>,
    pub filter_text: Option<String>,
    pub insert_text: String,
    pub edit: Option<TextEdit>,
    /// The insert text carries tab-indented continuation lines.
    pub snippet: bool,
    /// Fully qualified name of a module candidate.
    pub module: Option<String>,
}

/// Digits of the largest `order`, so keys compare correctly as strings.
const ORDER_WIDTH: usize = 20;

impl CompletionCandidate {
    pub fn sort_text(&self) -> String {
        format!("{}_{:0width$}", self.priority, self.order, width = ORDER_WIDTH)
    }
}

/// Shared cancellation flag of one completion request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a completion needs, gathered up front.
pub struct CompletionRequest<'a> {
    pub uri: &'a Url,
    pub text: &'a str,
    pub position: Point,
    pub settings: &'a Settings,
    pub library: &'a DocsLibrary,
    pub metadata_collections: &'a [String],
    pub fs: &'a dyn FileSystem,
}

/// Candidates at `position`, best first. `None` when cancelled or when the
/// cursor is in no known context.
pub async fn complete(
    context: &Arc<FolderContext>,
    uri: &Url,
    text: &str,
    position: Point,
    cancel: &CancelToken,
) -> Option<Vec<CompletionCandidate>> {
    if cancel.is_cancelled() {
        return None;
    }
    let library = context.docs_library().await;
    let settings = context.settings();
    let metadata_collections = context.metadata().collections_for(uri);
    let request = CompletionRequest {
        uri,
        text,
        position,
        settings: &settings,
        library: &library,
        metadata_collections: &metadata_collections,
        fs: context.fs().as_ref(),
    };
    complete_with(&request, cancel)
}

/// The source text with a placeholder inserted at the cursor, so a half-typed
/// line parses as a mapping entry (or as a value after `: `).
pub(crate) struct Prepared<'a> {
    pub original: &'a str,
    pub patched: String,
    pub offset: usize,
    pub placeholder: &'static str,
    pub lines: LineMap,
}

impl<'a> Prepared<'a> {
    fn new(text: &'a str, position: Point) -> Option<Self> {
        let lines = LineMap::new(text);
        let offset = lines.point_to_offset(text, position)?;
        let line_start = lines.line_start(position.line as usize)?;
        let placeholder = if text[line_start..offset].contains(": ") { "__" } else { "_:" };
        let mut patched = String::with_capacity(text.len() + placeholder.len());
        patched.push_str(&text[..offset]);
        patched.push_str(placeholder);
        patched.push_str(&text[offset..]);
        Some(Self {
            original: text,
            patched,
            offset,
            placeholder,
            lines,
        })
    }

    /// Offset in the original text of an offset in the patched text.
    fn original_offset(&self, patched: usize) -> usize {
        if patched <= self.offset {
            patched
        } else if patched >= self.offset + self.placeholder.len() {
            patched - self.placeholder.len()
        } else {
            self.offset
        }
    }

    pub fn at_end_of_line(&self) -> bool {
        matches!(self.original[self.offset..].chars().next(), None | Some('\n' | '\r'))
    }

    /// Range in the original text covered by the scalar at the end of `path`,
    /// placeholder excluded.
    pub fn node_range(&self, path: &Path<'_>) -> Option<TextRange> {
        let node = path.last_node()?;
        let doc = path.doc();
        doc.scalar(node)?;
        let span = doc.span(node);
        if !span.contains(self.offset, true) {
            return None;
        }
        let (start, end) = (self.original_offset(span.start), self.original_offset(span.end));
        Some(self.lines.span_to_range(self.original, start, end))
    }

    /// Whether only a sequence marker precedes `range` on its line.
    pub fn first_element_of_list(&self, range: Option<TextRange>) -> bool {
        let Some(range) = range else { return false };
        let Some(line_start) = self.lines.line_start(range.start.line as usize) else {
            return false;
        };
        let Some(start) = self.lines.point_to_offset(self.original, range.start) else {
            return false;
        };
        self.original[line_start..start].trim() == "-"
    }

    pub fn line_around_cursor(&self) -> (&'a str, &'a str) {
        let line_start = self.original[..self.offset].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.original[self.offset..]
            .find('\n')
            .map_or(self.original.len(), |i| self.offset + i);
        (&self.original[line_start..self.offset], &self.original[self.offset..line_end])
    }
}

/// Synchronous core of [`complete`].
pub fn complete_with(request: &CompletionRequest<'_>, cancel: &CancelToken) -> Option<Vec<CompletionCandidate>> {
    if cancel.is_cancelled() {
        return None;
    }
    let prepared = Prepared::new(request.text, request.position)?;
    let parsed = ParsedDocument::parse(&prepared.patched);
    if cancel.is_cancelled() {
        return None;
    }
    let path = path_at(&parsed, prepared.offset, true)?;
    path.last_node()?;

    let mut list = CandidateList::new(&prepared, request);
    classify(&mut list, &path, request)?;
    Some(list.finish())
}

/// Fill `list` for the context `path` points at. `None` when no context applies.
fn classify(list: &mut CandidateList<'_, '_>, path: &Path<'_>, request: &CompletionRequest<'_>) -> Option<()> {
    use crate::ansible::{play_without_task_keywords, BLOCK_KEYWORDS, PLAY_KEYWORDS, ROLE_KEYWORDS, TASK_KEYWORDS};

    let file_uri = request.uri.as_str();
    let is_play = is_play_param(path, Some(file_uri));
    if is_play == Some(true) {
        list.keywords(path, PLAY_KEYWORDS);
        return Some(());
    }
    if is_block_param(path) {
        list.keywords(path, BLOCK_KEYWORDS);
        return Some(());
    }
    if is_role_param(path) {
        list.keywords(path, ROLE_KEYWORDS);
        return Some(());
    }
    if is_task_param(path) {
        list.keywords(path, TASK_KEYWORDS);
        if is_play.is_none() {
            list.keywords(path, play_without_task_keywords());
        }
        let provided = request
            .library
            .find_provided_module(path, request.metadata_collections);
        if provided.is_none() {
            list.keywords(path, &["block"]);
            list.modules(path);
        }
        return Some(());
    }

    if is_playbook(request.text) && variables::inside_template(list.prepared(), path) {
        list.variables(variables::collect(path, request.uri, request.fs));
        return Some(());
    }

    if let Some(options) = possible_options(path, request) {
        list.options(path, &options);
        return Some(());
    }

    let owner = path.ancestry().parent(Some(Expect::Mapping));
    let key_path = match owner.value() {
        Some(None) => owner.parent(Some(Expect::Mapping)).key_path(),
        _ => owner.key_path(),
    }?;
    let key = key_path.key_name()?;
    let options = possible_options(&key_path, request)?;
    let option = options.get(key)?;
    list.values(path, option);
    Some(())
}

/// Options (or sub-options) that may appear in the mapping owning the key at
/// the end of `path`.
pub(crate) fn possible_options(path: &Path<'_>, request: &CompletionRequest<'_>) -> Option<OptionSet> {
    let (task_param_path, mut trace) = task_param_path_with_trace(path)?;
    let (_, kind) = trace.pop()?;
    if kind != TraceKind::Dict {
        return None;
    }
    let module_key = task_param_path.key_name()?;
    let library = request.library;
    let module = if module_key == "args" {
        library.find_provided_module(&task_param_path, request.metadata_collections)
    } else {
        library
            .find_module(module_key, Some(&task_param_path), request.metadata_collections)
            .0
    }?;
    let documentation = library.documentation(&module)?;

    let mut options = documentation.options.clone();
    for (name, kind) in trace.iter().rev() {
        let option = options.get(name)?;
        if option.type_name.as_deref() != Some(kind.type_name()) || option.suboptions.is_empty() {
            return None;
        }
        options = option.suboptions.clone();
    }
    Some(options)
}

/// The mapping whose keys the candidates at `path` would join.
pub(crate) fn enclosing_mapping_keys<'d>(path: &Path<'d>) -> Vec<&'d str> {
    let doc = path.doc();
    path.ancestry()
        .parent(Some(Expect::Mapping))
        .node()
        .map(|map| doc.keys(map))
        .unwrap_or_default()
}


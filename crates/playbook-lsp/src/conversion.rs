//! Conversion utilities between Core types and LSP types
//!
//! Core keeps its own coordinates (0-based lines, UTF-16 columns), so positions
//! map field by field.

use playbook_core::completion::{CandidateKind, CompletionCandidate};
use playbook_core::model::{
    Diagnostic as CoreDiagnostic, DiagnosticSeverity as CoreSeverity, FileChangeKind, FileEvent, Point, TextRange,
    WorkspaceFolder as CoreFolder,
};
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{
    CodeDescription, CompletionItem, CompletionItemKind, CompletionTextEdit, Diagnostic, DiagnosticRelatedInformation,
    DiagnosticSeverity, Documentation, FileChangeType, FileEvent as LspFileEvent, InsertTextFormat, Location,
    MarkupContent, MarkupKind, NumberOrString, Position, Range, TextEdit, Url, WorkspaceFolder,
};

/// Convert LSP Position to Core Point
pub fn lsp_position_to_point(position: Position) -> Point {
    Point {
        line: position.line,
        col: position.character,
    }
}

/// Convert Core Point to LSP Position
pub fn point_to_lsp_position(point: Point) -> Position {
    Position {
        line: point.line,
        character: point.col,
    }
}

/// Convert Core TextRange to LSP Range
pub fn text_range_to_lsp_range(range: TextRange) -> Range {
    Range {
        start: point_to_lsp_position(range.start),
        end: point_to_lsp_position(range.end),
    }
}

/// Convert Core Diagnostic to LSP Diagnostic
pub fn core_diagnostic_to_lsp_diagnostic(diag: CoreDiagnostic) -> Diagnostic {
    let severity = match diag.severity {
        CoreSeverity::Error => DiagnosticSeverity::ERROR,
        CoreSeverity::Warning => DiagnosticSeverity::WARNING,
        CoreSeverity::Information => DiagnosticSeverity::INFORMATION,
    };
    let code_description = diag
        .code_url
        .as_deref()
        .and_then(|url| Url::parse(url).ok())
        .map(|href| CodeDescription { href });
    let related_information = (!diag.related.is_empty()).then(|| {
        diag.related
            .into_iter()
            .map(|related| DiagnosticRelatedInformation {
                location: Location {
                    uri: related.uri,
                    range: text_range_to_lsp_range(related.range),
                },
                message: related.message,
            })
            .collect()
    });

    Diagnostic {
        range: text_range_to_lsp_range(diag.range),
        severity: Some(severity),
        code: diag.code.map(NumberOrString::String),
        code_description,
        source: Some(diag.source),
        message: diag.message,
        related_information,
        tags: None,
        data: None,
    }
}

/// Payload carried by module completion items until they are resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleItemData {
    pub module: String,
    pub uri: Url,
}

fn completion_kind(kind: CandidateKind) -> CompletionItemKind {
    match kind {
        CandidateKind::Keyword => CompletionItemKind::KEYWORD,
        CandidateKind::Module => CompletionItemKind::CLASS,
        CandidateKind::RedirectedModule => CompletionItemKind::REFERENCE,
        CandidateKind::Option => CompletionItemKind::PROPERTY,
        CandidateKind::Alias => CompletionItemKind::REFERENCE,
        CandidateKind::Value => CompletionItemKind::VALUE,
        CandidateKind::Variable => CompletionItemKind::VARIABLE,
    }
}

/// Convert a Core completion candidate to an LSP CompletionItem
pub fn candidate_to_completion_item(candidate: CompletionCandidate, uri: &Url) -> CompletionItem {
    let sort_text = candidate.sort_text();
    let data = candidate.module.map(|module| ModuleItemData {
        module,
        uri: uri.clone(),
    });
    let (insert_text, text_edit) = match candidate.edit {
        Some(edit) => (
            None,
            Some(CompletionTextEdit::Edit(TextEdit {
                range: text_range_to_lsp_range(edit.range),
                new_text: edit.new_text,
            })),
        ),
        None => (Some(candidate.insert_text), None),
    };

    CompletionItem {
        label: candidate.label,
        kind: Some(completion_kind(candidate.kind)),
        detail: candidate.detail,
        documentation: candidate.documentation.map(markdown),
        sort_text: Some(sort_text),
        filter_text: candidate.filter_text,
        insert_text,
        insert_text_format: candidate.snippet.then_some(InsertTextFormat::SNIPPET),
        text_edit,
        data: data.and_then(|d| serde_json::to_value(d).ok()),
        ..Default::default()
    }
}

pub fn markdown(value: String) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

/// Convert LSP file watcher events; unknown change types are dropped
pub fn lsp_file_events(events: Vec<LspFileEvent>) -> Vec<FileEvent> {
    events
        .into_iter()
        .filter_map(|event| {
            let kind = match event.typ {
                FileChangeType::CREATED => FileChangeKind::Created,
                FileChangeType::CHANGED => FileChangeKind::Changed,
                FileChangeType::DELETED => FileChangeKind::Deleted,
                _ => return None,
            };
            Some(FileEvent { uri: event.uri, kind })
        })
        .collect()
}

pub fn lsp_folder_to_core(folder: WorkspaceFolder) -> CoreFolder {
    CoreFolder::new(folder.uri, folder.name)
}

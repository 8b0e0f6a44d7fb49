use crate::conversion::core_diagnostic_to_lsp_diagnostic;
use crate::state::GlobalState;
use playbook_core::model::DiagnosticsByFile;
use playbook_core::validation::validate;
use std::sync::PoisonError;
use tower_lsp::Client;
use url::Url;

/// Validate an open document and publish the results. Files the document no
/// longer reports on get an empty diagnostics list. Nothing is published for a
/// document closed while it was being validated. Returns what was published.
pub async fn validate_document(client: &Client, state: &GlobalState, uri: &Url, quick: bool) -> DiagnosticsByFile {
    let Some(text) = state.document_text(uri).await else {
        return DiagnosticsByFile::new();
    };
    let context = state.workspace.read().await.get_context(uri);
    let Some(context) = context else {
        log::warn!("No workspace folder serves {uri}");
        return DiagnosticsByFile::new();
    };

    let diagnostics = validate(&context, &state.validation, uri, &text, quick).await;
    if !state.documents.read().await.contains_key(uri) {
        log::debug!("{uri} closed during validation, discarding results");
        state
            .validation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release(uri);
        return DiagnosticsByFile::new();
    }
    let stale = state
        .validation
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .track(uri, &diagnostics);

    for (file, items) in &diagnostics {
        let items = items.iter().cloned().map(core_diagnostic_to_lsp_diagnostic).collect();
        client.publish_diagnostics(file.clone(), items, None).await;
    }
    clear_diagnostics(client, stale).await;
    diagnostics
}

pub async fn clear_diagnostics(client: &Client, files: Vec<Url>) {
    for file in files {
        client.publish_diagnostics(file, Vec::new(), None).await;
    }
}

/// Full pass over every open document, after settings changed.
pub async fn revalidate_open_documents(client: &Client, state: &GlobalState) {
    let uris: Vec<Url> = state.documents.read().await.keys().cloned().collect();
    for uri in uris {
        validate_document(client, state, &uri, false).await;
    }
}

use crate::conversion::{lsp_file_events, lsp_folder_to_core};
use crate::handlers::{clear_diagnostics, validate_document};
use crate::state::GlobalState;
use std::sync::PoisonError;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;

/// Handle "textDocument/didOpen" notification
pub async fn handle_did_open(client: &Client, state: &GlobalState, params: DidOpenTextDocumentParams) {
    let uri = params.text_document.uri;
    {
        let mut documents = state.documents.write().await;
        documents.insert(uri.clone(), params.text_document.text);
    }
    validate_document(client, state, &uri, false).await;
}

/// Handle "textDocument/didChange" notification
pub async fn handle_did_change(client: &Client, state: &GlobalState, params: DidChangeTextDocumentParams) {
    let uri = params.text_document.uri;
    let Some(last_change) = params.content_changes.into_iter().last() else {
        return;
    };
    {
        let mut documents = state.documents.write().await;
        documents.insert(uri.clone(), last_change.text);
    }
    validate_document(client, state, &uri, true).await;
}

/// Handle "textDocument/didSave" notification
pub async fn handle_did_save(client: &Client, state: &GlobalState, params: DidSaveTextDocumentParams) {
    let uri = params.text_document.uri;
    if let Some(text) = params.text {
        state.documents.write().await.insert(uri.clone(), text);
    }
    validate_document(client, state, &uri, false).await;
}

/// Handle "textDocument/didClose" notification
pub async fn handle_did_close(client: &Client, state: &GlobalState, params: DidCloseTextDocumentParams) {
    let uri = params.text_document.uri;
    state.documents.write().await.remove(&uri);
    if let Some(token) = state
        .completions
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&uri)
    {
        token.cancel();
    }
    let released = state
        .validation
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .release(&uri);
    clear_diagnostics(client, released).await;
}

/// Handle "workspace/didChangeWatchedFiles" notification
pub async fn handle_did_change_watched_files(state: &GlobalState, params: DidChangeWatchedFilesParams) {
    let events = lsp_file_events(params.changes);
    if events.is_empty() {
        return;
    }
    log::debug!("{} watched file event(s)", events.len());
    state.workspace.read().await.handle_file_events(&events);
}

/// Handle "workspace/didChangeWorkspaceFolders" notification
pub async fn handle_did_change_workspace_folders(state: &GlobalState, params: DidChangeWorkspaceFoldersParams) {
    let added = params.event.added.into_iter().map(lsp_folder_to_core).collect();
    let removed: Vec<_> = params.event.removed.into_iter().map(lsp_folder_to_core).collect();
    state.workspace.write().await.handle_folder_changes(added, &removed);
}

use crate::conversion::{candidate_to_completion_item, lsp_position_to_point, markdown, ModuleItemData};
use crate::state::GlobalState;
use playbook_core::completion::{complete, module_documentation, CancelToken};
use std::sync::PoisonError;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

/// Handle "textDocument/completion" request
pub async fn handle_completion(state: &GlobalState, params: CompletionParams) -> Result<Option<CompletionResponse>> {
    let uri = params.text_document_position.text_document.uri;
    let position = lsp_position_to_point(params.text_document_position.position);

    let Some(text) = state.document_text(&uri).await else {
        return Ok(None);
    };
    let context = state.workspace.read().await.get_context(&uri);
    let Some(context) = context else {
        return Ok(None);
    };

    // A newer request for the same document supersedes the pending one.
    let token = CancelToken::new();
    if let Some(previous) = state
        .completions
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(uri.clone(), token.clone())
    {
        previous.cancel();
    }

    let candidates = complete(&context, &uri, &text, position, &token).await;
    let Some(candidates) = candidates else {
        log::debug!("Completion at {}:{} produced nothing", position.line, position.col);
        return Ok(None);
    };
    let items = candidates
        .into_iter()
        .map(|candidate| candidate_to_completion_item(candidate, &uri))
        .collect();
    Ok(Some(CompletionResponse::Array(items)))
}

/// Handle "completionItem/resolve" request: attach module documentation
pub async fn handle_completion_resolve(state: &GlobalState, mut item: CompletionItem) -> Result<CompletionItem> {
    let Some(data) = item
        .data
        .clone()
        .and_then(|data| serde_json::from_value::<ModuleItemData>(data).ok())
    else {
        return Ok(item);
    };
    let context = state.workspace.read().await.get_context(&data.uri);
    let Some(context) = context else {
        return Ok(item);
    };
    let library = context.docs_library().await;
    if let Some(documentation) = module_documentation(&library, &data.module) {
        item.documentation = Some(markdown(documentation));
    }
    Ok(item)
}

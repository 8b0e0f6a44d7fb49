use crate::config::settings_from_payload;
use crate::conversion::lsp_folder_to_core;
use crate::state::GlobalState;
use playbook_core::model::WorkspaceFolder as CoreFolder;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;

fn initial_folders(params: &InitializeParams) -> Vec<CoreFolder> {
    if let Some(folders) = &params.workspace_folders {
        return folders.iter().cloned().map(lsp_folder_to_core).collect();
    }
    #[allow(deprecated)]
    let root = params.root_uri.clone();
    root.map(|uri| {
        let name = uri
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string();
        CoreFolder::new(uri, name)
    })
    .into_iter()
    .collect()
}

/// Handle "initialize" request
pub async fn handle_initialize(client: &Client, state: &GlobalState, params: InitializeParams) -> Result<InitializeResult> {
    let progress = params
        .capabilities
        .window
        .as_ref()
        .and_then(|window| window.work_done_progress)
        .unwrap_or(false);
    state.set_progress_supported(progress);

    let folders = initial_folders(&params);
    if folders.is_empty() {
        client
            .log_message(MessageType::WARNING, "No workspace folder provided!")
            .await;
    }
    for folder in &folders {
        client
            .log_message(
                MessageType::INFO,
                format!("Initializing workspace folder at: {}", folder.uri),
            )
            .await;
    }

    {
        let mut workspace = state.workspace.write().await;
        workspace.set_folders(folders);
        match params.initialization_options.as_ref().map(settings_from_payload) {
            Some(Some(Ok(settings))) => workspace.update_settings(settings),
            Some(Some(Err(e))) => {
                log::warn!("Ignoring invalid initialization options: {e}");
            }
            _ => {}
        }
    }

    Ok(InitializeResult {
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(true),
                })),
                ..Default::default()
            })),
            completion_provider: Some(CompletionOptions {
                trigger_characters: None,
                all_commit_characters: None,
                resolve_provider: Some(true),
                work_done_progress_options: Default::default(),
                completion_item: Default::default(),
            }),
            workspace: Some(WorkspaceServerCapabilities {
                workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                    supported: Some(true),
                    change_notifications: Some(OneOf::Left(true)),
                }),
                file_operations: None,
            }),
            ..Default::default()
        },
        server_info: Some(ServerInfo {
            name: "playbook-ls".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    })
}

/// Handle "initialized" notification: ask the client to watch the workspace
pub async fn handle_initialized(client: &Client) {
    let options = DidChangeWatchedFilesRegistrationOptions {
        watchers: vec![FileSystemWatcher {
            glob_pattern: GlobPattern::String("**/*".to_string()),
            kind: None,
        }],
    };
    let registration = Registration {
        id: "playbook-ls/watched-files".to_string(),
        method: "workspace/didChangeWatchedFiles".to_string(),
        register_options: serde_json::to_value(options).ok(),
    };
    if let Err(e) = client.register_capability(vec![registration]).await {
        log::warn!("Client did not accept file watching: {e}");
    }
    client
        .log_message(MessageType::INFO, "Client initialized, ready to accept requests")
        .await;
}

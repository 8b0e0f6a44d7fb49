//! Playbook LSP Library
//!
//! LSP protocol layer, converts JSON-RPC requests to Core library calls.

use playbook_core::exec::{CommandExecutor, ShellExecutor};
use playbook_core::vfs::PhysicalFileSystem;
use playbook_core::{Services, Settings, WorkspaceManager};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LspService};

use crate::notifier::LspNotifier;
use crate::state::GlobalState;

mod config;
mod conversion;
mod handlers;
mod notifier;
mod state;

/// LSP backend implementation
pub struct Backend {
    client: Client,
    state: GlobalState,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::with_executor(client, Arc::new(ShellExecutor))
    }

    /// Backend whose external commands all go through `executor`.
    pub fn with_executor(client: Client, executor: Arc<dyn CommandExecutor>) -> Self {
        let progress_supported = Arc::new(AtomicBool::new(false));
        let notifier = LspNotifier::new(client.clone(), Arc::clone(&progress_supported));
        let cache_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("playbook-ls");
        let services = Services {
            executor,
            notifier: Arc::new(notifier),
            fs: Arc::new(PhysicalFileSystem),
            cache_root,
        };
        let workspace = WorkspaceManager::new(services, Settings::default());
        Self {
            client,
            state: GlobalState::new(workspace, progress_supported),
        }
    }
}

#[tower_lsp::async_trait]
impl tower_lsp::LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handlers::handle_initialize(&self.client, &self.state, params).await
    }

    async fn initialized(&self, _: InitializedParams) {
        handlers::handle_initialized(&self.client).await;
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("Shutdown requested");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        handlers::handle_did_open(&self.client, &self.state, params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        handlers::handle_did_change(&self.client, &self.state, params).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        handlers::handle_did_save(&self.client, &self.state, params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        handlers::handle_did_close(&self.client, &self.state, params).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        handlers::handle_did_change_watched_files(&self.state, params).await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        handlers::handle_did_change_workspace_folders(&self.state, params).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        handlers::handle_did_change_configuration(&self.client, &self.state, params).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        handlers::handle_completion(&self.state, params).await
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        handlers::handle_completion_resolve(&self.state, item).await
    }
}

/// Create and return LSP service and client socket
pub fn create_lsp_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(Backend::new)
}

//! Forwards engine messages to the client.

use playbook_core::notify::{Notifier, ProgressToken};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tower_lsp::lsp_types::notification::Progress;
use tower_lsp::lsp_types::request::WorkDoneProgressCreate;
use tower_lsp::lsp_types::{
    MessageType, NumberOrString, ProgressParams, ProgressParamsValue, WorkDoneProgress, WorkDoneProgressBegin,
    WorkDoneProgressCreateParams, WorkDoneProgressEnd,
};
use tower_lsp::Client;

/// `window/showMessage` for messages, work-done progress when the client
/// supports it.
pub struct LspNotifier {
    client: Client,
    progress_supported: Arc<AtomicBool>,
    next_token: AtomicU64,
}

impl LspNotifier {
    pub fn new(client: Client, progress_supported: Arc<AtomicBool>) -> Self {
        Self {
            client,
            progress_supported,
            next_token: AtomicU64::new(0),
        }
    }
}

#[tower_lsp::async_trait]
impl Notifier for LspNotifier {
    async fn show_error(&self, message: String) {
        log::error!("{message}");
        self.client.show_message(MessageType::ERROR, message).await;
    }

    async fn show_info(&self, message: String) {
        log::info!("{message}");
        self.client.show_message(MessageType::INFO, message).await;
    }

    async fn begin_progress(&self, title: &str, message: &str) -> Option<ProgressToken> {
        if !self.progress_supported.load(Ordering::SeqCst) {
            return None;
        }
        let id = format!("playbook-ls/{}", self.next_token.fetch_add(1, Ordering::SeqCst));
        let token = NumberOrString::String(id.clone());
        if let Err(e) = self
            .client
            .send_request::<WorkDoneProgressCreate>(WorkDoneProgressCreateParams { token: token.clone() })
            .await
        {
            log::debug!("Client refused progress token {id}: {e}");
            return None;
        }
        self.client
            .send_notification::<Progress>(ProgressParams {
                token,
                value: ProgressParamsValue::WorkDone(WorkDoneProgress::Begin(WorkDoneProgressBegin {
                    title: title.to_string(),
                    cancellable: Some(false),
                    message: Some(message.to_string()),
                    percentage: None,
                })),
            })
            .await;
        Some(ProgressToken(id))
    }

    async fn end_progress(&self, token: ProgressToken) {
        self.client
            .send_notification::<Progress>(ProgressParams {
                token: NumberOrString::String(token.0),
                value: ProgressParamsValue::WorkDone(WorkDoneProgress::End(WorkDoneProgressEnd { message: None })),
            })
            .await;
    }
}

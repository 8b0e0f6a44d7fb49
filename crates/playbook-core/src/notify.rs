//! User-facing messages and progress reporting.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressToken(pub String);

/// Sink for messages the user should see. The server forwards them to the client.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show_error(&self, message: String);

    async fn show_info(&self, message: String);

    /// Start a progress indicator; `None` when the host does not support one.
    async fn begin_progress(&self, title: &str, message: &str) -> Option<ProgressToken>;

    async fn end_progress(&self, token: ProgressToken);
}

/// Notifier that only writes to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show_error(&self, message: String) {
        log::error!("{message}");
    }

    async fn show_info(&self, message: String) {
        log::info!("{message}");
    }

    async fn begin_progress(&self, title: &str, message: &str) -> Option<ProgressToken> {
        log::info!("{title}: {message}");
        None
    }

    async fn end_progress(&self, _token: ProgressToken) {}
}

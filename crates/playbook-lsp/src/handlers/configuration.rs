use crate::config::settings_from_payload;
use crate::handlers::revalidate_open_documents;
use crate::state::GlobalState;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;

pub async fn handle_did_change_configuration(
    client: &Client,
    state: &GlobalState,
    params: DidChangeConfigurationParams,
) {
    match settings_from_payload(&params.settings) {
        Some(Ok(settings)) => {
            state.workspace.write().await.update_settings(settings);
            client
                .log_message(MessageType::INFO, "Settings updated")
                .await;
            revalidate_open_documents(client, state).await;
        }
        Some(Err(e)) => {
            client
                .log_message(
                    MessageType::ERROR,
                    format!("Failed to parse updated settings: {}", e),
                )
                .await;
        }
        None => log::debug!("Configuration change without settings payload"),
    }
}

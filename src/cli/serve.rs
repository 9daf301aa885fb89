use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    api::{self, WebhookState},
    config::Config,
    error,
    management::TokenManager,
    server,
    spotify::SpotifyClient,
    sync::SyncOrchestrator,
    telegram::TelegramClient,
};

/// Runs the relay: registers the webhook and serves it until stopped.
pub async fn serve(register_webhook: bool) {
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => error!("Invalid configuration: {}. Run playrelay verify for details.", e),
    };

    let tokens = match TokenManager::load(config.spotify.clone()).await {
        Ok(tokens) => tokens,
        Err(e) => error!(
            "Failed to load Spotify token. Please run playrelay auth\n Error: {}",
            e
        ),
    };

    let spotify = match SpotifyClient::new(tokens, &config.spotify) {
        Ok(client) => Arc::new(client),
        Err(e) => error!("Failed to set up Spotify client: {}", e),
    };

    let orchestrator = Arc::new(SyncOrchestrator::new(
        spotify,
        config.spotify.playlist_id.clone(),
        config.sync.clone(),
    ));
    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.telegram_bot_token,
    ));

    if register_webhook {
        match telegram
            .set_webhook(&config.webhook_url, config.webhook_secret.as_deref())
            .await
        {
            Ok(()) => info!(url = %config.webhook_url, "webhook registered"),
            Err(e) => warn!("Could not register webhook: {}", e),
        }
    }

    info!(
        playlist_id = %config.spotify.playlist_id,
        chats = config.allowed_chat_ids.len(),
        "relay ready"
    );

    let addr = config.server_addr();
    let app = api::router(WebhookState::new(orchestrator, telegram, Arc::clone(&config)));
    if let Err(e) = server::start_api_server(&addr, app).await {
        error!("Server stopped: {}", e);
    }
}

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use reqwest::{Client, Url};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    Res, api,
    config::SpotifyConfig,
    error::ApiError,
    info,
    management::{TokenManager, token_from_json},
    server, success,
    types::{PkceToken, Token},
    utils, warning,
};

/// How long `auth` waits for the browser round trip.
const CALLBACK_WAIT: Duration = Duration::from_secs(120);

/// Runs the OAuth 2.0 PKCE flow for the account owning the target playlist.
///
/// Starts a temporary callback server on the redirect URI's address,
/// opens the consent page in the browser and stores the resulting token
/// where `serve` expects it.
pub async fn auth(settings: SpotifyConfig) -> Res<()> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let shared_state: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(Some(PkceToken {
        code_verifier,
        token: None,
    })));

    let callback_state = api::CallbackState {
        pkce: Arc::clone(&shared_state),
        settings: settings.clone(),
    };
    let app = Router::new()
        .route("/health", get(api::health))
        .route(&callback_path(&settings.redirect_uri), get(api::callback))
        .with_state(callback_state);
    let addr = settings.callback_addr()?;
    tokio::spawn(async move {
        if let Err(e) = server::start_api_server(&addr, app).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = authorize_url(&settings, &code_challenge)?;
    info!("Opening Spotify consent page for {}", settings.username);
    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let Some(token) = wait_for_token(shared_state).await else {
        return Err("authentication failed or timed out".into());
    };

    let token_manager = TokenManager::new(token, settings.clone());
    token_manager
        .persist()
        .await
        .map_err(|e| format!("failed to save token: {e}"))?;

    success!(
        "Authentication successful, token stored at {}",
        TokenManager::token_path(&settings.username).display()
    );
    Ok(())
}

pub fn authorize_url(settings: &SpotifyConfig, code_challenge: &str) -> Result<String, String> {
    let url = Url::parse_with_params(
        &settings.auth_url,
        &[
            ("client_id", settings.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", settings.scope.as_str()),
        ],
    )
    .map_err(|e| e.to_string())?;
    Ok(url.to_string())
}

fn callback_path(redirect_uri: &str) -> String {
    Url::parse(redirect_uri)
        .ok()
        .map(|u| u.path().to_string())
        .filter(|p| p != "/")
        .unwrap_or_else(|| "/callback".to_string())
}

async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let start = Instant::now();

    while start.elapsed() < CALLBACK_WAIT {
        let lock = shared_state.lock().await;
        if let Some(token) = lock.as_ref().and_then(|p| p.token.as_ref()) {
            return Some(token.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

pub async fn exchange_code_pkce(
    settings: &SpotifyConfig,
    code: &str,
    verifier: &str,
) -> Result<Token, ApiError> {
    let client = Client::new();
    let mut request = client.post(&settings.token_url).form(&[
        ("grant_type", "authorization_code"),
        ("client_id", settings.client_id.as_str()),
        ("code", code),
        ("code_verifier", verifier),
        ("redirect_uri", settings.redirect_uri.as_str()),
    ]);
    if let Some(secret) = &settings.client_secret {
        request = request.basic_auth(&settings.client_id, Some(secret));
    }

    let res = request.send().await?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(ApiError::Auth(format!("code exchange failed ({status}): {body}")));
    }

    let json: Value = res.json().await?;
    token_from_json(&json, None)
}

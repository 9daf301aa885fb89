use std::{collections::HashMap, sync::Arc};

use axum::{extract::Query, extract::State, response::Html};
use tokio::sync::Mutex;

use crate::{config::SpotifyConfig, spotify::auth::exchange_code_pkce, types::PkceToken, warning};

#[derive(Clone)]
pub struct CallbackState {
    pub pkce: Arc<Mutex<Option<PkceToken>>>,
    pub settings: SpotifyConfig,
}

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<CallbackState>,
) -> Html<&'static str> {
    if let Some(error) = params.get("error") {
        warning!("Spotify denied authorization: {}", error);
        return Html("<h4>Authorization was denied.</h4>");
    }

    let Some(code) = params.get("code") else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    let mut pkce = state.pkce.lock().await;
    let Some(pkce_state) = pkce.as_mut() else {
        return Html("<h4>Missing PKCE code verifier.</h4>");
    };

    let verifier = pkce_state.code_verifier.clone();
    match exchange_code_pkce(&state.settings, code, &verifier).await {
        Ok(token) => {
            pkce_state.token = Some(token);
            Html("<h2>Authentication successful.</h2><p>You can close this window.</p>")
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Html("<h4>Login failed.</h4>")
        }
    }
}

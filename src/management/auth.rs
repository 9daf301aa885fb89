use std::path::PathBuf;

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::{config, config::SpotifyConfig, error::ApiError, types::Token};

/// Seconds before expiry at which a token is refreshed.
const EXPIRY_BUFFER_SECS: u64 = 240;

/// Persisted OAuth token of the Spotify account that owns the playlist.
pub struct TokenManager {
    token: Token,
    settings: SpotifyConfig,
}

impl TokenManager {
    pub fn new(token: Token, settings: SpotifyConfig) -> Self {
        TokenManager { token, settings }
    }

    pub async fn load(settings: SpotifyConfig) -> Result<Self, String> {
        let path = Self::token_path(&settings.username);
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self { token, settings })
    }

    pub async fn persist(&self) -> Result<(), String> {
        let path = Self::token_path(&self.settings.username);
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(&path, json)
            .await
            .map_err(|e| e.to_string())
    }

    /// Access token that is valid for at least a few more minutes.
    pub async fn get_valid_token(&mut self) -> Result<String, ApiError> {
        if self.is_expired() {
            let refreshed = refresh_token(&self.settings, &self.token.refresh_token).await?;
            self.token = refreshed;
            if let Err(e) = self.persist().await {
                warn!("Could not persist refreshed token: {}", e);
            }
            info!("Refreshed Spotify access token");
        }

        Ok(self.token.access_token.clone())
    }

    fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + EXPIRY_BUFFER_SECS >= self.token.obtained_at + self.token.expires_in
    }

    pub fn token_path(username: &str) -> PathBuf {
        let mut path = config::data_dir();
        path.push(format!("cache/token-{username}.json"));
        path
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}

/// Trades a refresh token for a new access token.
///
/// Spotify may omit the refresh token from the answer, in which case the
/// old one stays valid.
pub async fn refresh_token(settings: &SpotifyConfig, refresh_token: &str) -> Result<Token, ApiError> {
    let client = Client::new();
    let mut request = client.post(&settings.token_url).form(&[
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", settings.client_id.as_str()),
    ]);
    if let Some(secret) = &settings.client_secret {
        request = request.basic_auth(&settings.client_id, Some(secret));
    }

    let res = request.send().await?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(ApiError::Auth(format!("token refresh failed ({status}): {body}")));
    }

    let json: Value = res.json().await?;
    token_from_json(&json, Some(refresh_token))
}

/// Builds a [`Token`] from a token endpoint answer.
pub fn token_from_json(json: &Value, previous_refresh: Option<&str>) -> Result<Token, ApiError> {
    let access_token = json["access_token"]
        .as_str()
        .ok_or_else(|| ApiError::Auth("token response without access_token".to_string()))?;
    let refresh_token = json["refresh_token"]
        .as_str()
        .or(previous_refresh)
        .ok_or_else(|| ApiError::Auth("token response without refresh_token".to_string()))?;

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}

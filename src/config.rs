//! Configuration management for the relay.
//!
//! Values come from the process environment and from `.env` files. The
//! configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the working directory
//! 3. `.env` in the local data directory (`<data_local_dir>/playrelay/.env`)
//! 4. Application defaults (where applicable)
//!
//! [`Config::from_lookup`] builds the typed configuration from any key
//! lookup, so tests do not have to touch the process environment.

use std::{env, path::PathBuf, time::Duration};

use reqwest::Url;
use tokio::sync::Semaphore;

use crate::{
    error::ConfigError,
    sync::{RetryPolicy, SyncSettings},
    utils,
};

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SPOTIFY_SCOPE: &str =
    "playlist-modify-public playlist-modify-private playlist-read-private";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Variables that must be present for `serve`.
pub const REQUIRED_VARS: [&str; 7] = [
    "TELEGRAM_BOT_TOKEN",
    "SPOTIFY_CLIENT_ID",
    "SPOTIFY_REDIRECT_URI",
    "SPOTIFY_PLAYLIST_ID",
    "SPOTIFY_USERNAME",
    "ALLOWED_CHAT_IDS",
    "WEBHOOK_URL",
];

/// Loads `.env` files into the process environment.
///
/// Missing files are fine; a file that exists but cannot be parsed is an
/// error. Variables already set in the environment are never overridden.
pub fn load_env() -> Result<(), String> {
    match dotenv::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(format!("cannot read ./.env: {e}")),
    }

    let path = data_dir().join(".env");
    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    }
    Ok(())
}

/// `<data_local_dir>/playrelay`, or `./playrelay` if the platform has none.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("playrelay");
    path
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub username: String,
    pub playlist_id: String,
    pub scope: String,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
}

impl SpotifyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redirect_uri = required(&lookup, "SPOTIFY_REDIRECT_URI")?;
        parse_url("SPOTIFY_REDIRECT_URI", &redirect_uri)?;

        Ok(Self {
            client_id: required(&lookup, "SPOTIFY_CLIENT_ID")?,
            client_secret: optional(&lookup, "SPOTIFY_CLIENT_SECRET"),
            redirect_uri,
            username: required(&lookup, "SPOTIFY_USERNAME")?,
            playlist_id: required(&lookup, "SPOTIFY_PLAYLIST_ID")?,
            scope: optional(&lookup, "SPOTIFY_API_AUTH_SCOPE")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_SCOPE.to_string()),
            api_url: trimmed_url(&lookup, "SPOTIFY_API_URL", DEFAULT_SPOTIFY_API_URL),
            auth_url: trimmed_url(&lookup, "SPOTIFY_API_AUTH_URL", DEFAULT_SPOTIFY_AUTH_URL),
            token_url: trimmed_url(&lookup, "SPOTIFY_API_TOKEN_URL", DEFAULT_SPOTIFY_TOKEN_URL),
        })
    }

    /// Host and port the OAuth callback listens on, taken from the redirect URI.
    pub fn callback_addr(&self) -> Result<String, ConfigError> {
        let url = parse_url("SPOTIFY_REDIRECT_URI", &self.redirect_uri)?;
        let host = url.host_str().unwrap_or("127.0.0.1");
        let port = url.port_or_known_default().unwrap_or(8888);
        Ok(format!("{host}:{port}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub telegram_bot_token: String,
    pub telegram_api_url: String,
    pub webhook_url: String,
    pub webhook_secret: Option<String>,
    pub allowed_chat_ids: Vec<i64>,
    pub enable_confirmation_messages: bool,
    pub enable_error_messages: bool,
    pub app_host: String,
    pub app_port: u16,
    pub spotify: SpotifyConfig,
    pub sync: SyncSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook_url = required(&lookup, "WEBHOOK_URL")?;
        parse_url("WEBHOOK_URL", &webhook_url)?;

        let allowed_chat_ids = utils::parse_chat_ids(&required(&lookup, "ALLOWED_CHAT_IDS")?)
            .map_err(|reason| ConfigError::Invalid {
                key: "ALLOWED_CHAT_IDS",
                reason,
            })?;

        let defaults = SyncSettings::default();
        let max_pending_events = parsed(&lookup, "SYNC_MAX_PENDING_EVENTS")?
            .unwrap_or(defaults.max_pending_events);
        if !(1..=Semaphore::MAX_PERMITS).contains(&max_pending_events) {
            return Err(ConfigError::Invalid {
                key: "SYNC_MAX_PENDING_EVENTS",
                reason: format!("must be between 1 and {}", Semaphore::MAX_PERMITS),
            });
        }

        let retry = RetryPolicy {
            max_attempts: parsed(&lookup, "SYNC_MAX_ATTEMPTS")?
                .unwrap_or(defaults.retry.max_attempts),
            base_delay: parsed(&lookup, "SYNC_BASE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            max_delay: parsed(&lookup, "SYNC_MAX_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay),
            call_timeout: parsed(&lookup, "SYNC_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.call_timeout),
        };

        let sync = SyncSettings {
            retry,
            lock_timeout: parsed(&lookup, "SYNC_LOCK_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_timeout),
            max_pending_events,
            cache_max_age: parsed(&lookup, "SYNC_CACHE_MAX_AGE_SECS")?
                .map(Duration::from_secs)
                .or(defaults.cache_max_age),
        };

        Ok(Self {
            telegram_bot_token: required(&lookup, "TELEGRAM_BOT_TOKEN")?,
            telegram_api_url: trimmed_url(&lookup, "TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL),
            webhook_url,
            webhook_secret: optional(&lookup, "TELEGRAM_WEBHOOK_SECRET"),
            allowed_chat_ids,
            enable_confirmation_messages: flag(&lookup, "ENABLE_CONFIRMATION_MESSAGES", false)?,
            enable_error_messages: flag(&lookup, "ENABLE_ERROR_MESSAGES", true)?,
            app_host: optional(&lookup, "APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            app_port: parsed(&lookup, "APP_PORT")?.unwrap_or(8000),
            spotify: SpotifyConfig::from_lookup(&lookup)?,
            sync,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }

    pub fn is_allowed_chat(&self, chat_id: i64) -> bool {
        self.allowed_chat_ids.contains(&chat_id)
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or(ConfigError::Missing(key))
}

fn parsed<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional(lookup, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, key) {
        None => Ok(default),
        Some(raw) => utils::parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
            key,
            reason: format!("expected true or false, got {raw:?}"),
        }),
    }
}

fn trimmed_url<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key)
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

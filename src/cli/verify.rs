use std::env;

use colored::Colorize;

use crate::{
    config::{self, Config, REQUIRED_VARS},
    info,
    management::TokenManager,
    success, warning,
};

/// Values shipped in `.env.example` that must be replaced before deploying.
const PLACEHOLDERS: [&str; 7] = [
    "YOUR_TELEGRAM_BOT_TOKEN",
    "your_spotify_client_id",
    "your_spotify_client_secret",
    "your_playlist_id",
    "your_spotify_username",
    "your-domain.com",
    "changeme",
];

/// Checks that the relay is configured and authorized; exits 1 otherwise.
pub async fn verify() {
    let checks: [(&str, bool); 3] = [
        ("Environment configuration", check_env()),
        ("Configuration values", check_config()),
        ("Spotify authentication", check_token().await),
    ];

    println!();
    let passed = checks.iter().filter(|(_, ok)| *ok).count();
    for (name, ok) in &checks {
        if *ok {
            success!("{}", name);
        } else {
            println!("[{}] {}", "✗".red().bold(), name);
        }
    }

    if passed == checks.len() {
        success!("All checks passed ({}/{}), ready to serve.", passed, checks.len());
    } else {
        warning!(
            "Some checks failed ({}/{}). Please fix the issues above before deploying.",
            passed,
            checks.len()
        );
        std::process::exit(1);
    }
}

fn check_env() -> bool {
    info!("Checking required environment variables");
    let mut all_good = true;
    for var in REQUIRED_VARS {
        match env::var(var).ok().filter(|v| !v.trim().is_empty()) {
            None => {
                warning!("{} is not set", var);
                all_good = false;
            }
            Some(value) if is_placeholder(&value) => {
                warning!("{} still has a placeholder value: {}", var, value);
                all_good = false;
            }
            Some(_) => success!("{} is configured", var),
        }
    }

    if env::var("SPOTIFY_CLIENT_SECRET").is_err() {
        info!("SPOTIFY_CLIENT_SECRET not set, using PKCE without a client secret");
    }
    all_good
}

fn check_config() -> bool {
    info!("Parsing configuration");
    match Config::from_env() {
        Ok(config) => {
            success!(
                "Relaying {} chat(s) into playlist {} on {}",
                config.allowed_chat_ids.len(),
                config.spotify.playlist_id,
                config.server_addr()
            );
            true
        }
        Err(e) => {
            warning!("{}", e);
            false
        }
    }
}

async fn check_token() -> bool {
    info!("Looking for a stored Spotify token");
    let Ok(username) = env::var("SPOTIFY_USERNAME") else {
        warning!("SPOTIFY_USERNAME is not set, cannot locate the token cache");
        return false;
    };

    let path = TokenManager::token_path(&username);
    if async_fs::metadata(&path).await.is_ok() {
        success!("Spotify token found at {}", path.display());
        true
    } else {
        warning!(
            "No Spotify token at {}. Run playrelay auth (data dir: {})",
            path.display(),
            config::data_dir().display()
        );
        false
    }
}

pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| value.contains(p))
}

use crate::{config::SpotifyConfig, error, spotify};

pub async fn auth() {
    let settings = match SpotifyConfig::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Invalid Spotify configuration: {}", e),
    };

    if let Err(e) = spotify::auth::auth(settings).await {
        error!("Authentication failed: {}", e);
    }
}

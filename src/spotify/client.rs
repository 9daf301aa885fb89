use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, redirect};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    config::SpotifyConfig,
    error::ApiError,
    management::TokenManager,
    sync::{MusicApi, TrackId, TrackPage},
    types::{
        AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, Paging, PlaylistItem,
        SimplifiedTrack,
    },
};

const ALBUM_PAGE_LIMIT: u32 = 50;
const PLAYLIST_PAGE_LIMIT: u32 = 100;

/// [`MusicApi`] backed by the Spotify Web API.
pub struct SpotifyClient {
    http: Client,
    links: Client,
    api_url: String,
    tokens: Mutex<TokenManager>,
}

impl SpotifyClient {
    pub fn new(tokens: TokenManager, settings: &SpotifyConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("playrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let links = Client::builder()
            .redirect(redirect::Policy::limited(10))
            .user_agent(concat!("playrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            links,
            api_url: settings.api_url.clone(),
            tokens: Mutex::new(tokens),
        })
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.tokens.lock().await.get_valid_token().await?;
        let response = request.bearer_auth(token).send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!(url, "GET");
        let response = self.authorized(self.http.get(url)).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MusicApi for SpotifyClient {
    async fn resolve_short_link(&self, url: &str) -> Result<Option<String>, ApiError> {
        let response = self.links.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.url().to_string()))
    }

    async fn album_tracks(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, ApiError> {
        let url = match page_token {
            Some(next) => next.to_string(),
            None => format!(
                "{uri}/albums/{id}/tracks?limit={limit}",
                uri = self.api_url,
                id = album_id,
                limit = ALBUM_PAGE_LIMIT
            ),
        };

        let page: Paging<SimplifiedTrack> = self.get_json(&url).await?;
        Ok(TrackPage {
            entries: page
                .items
                .into_iter()
                .map(|track| track.id.filter(|_| !track.is_local).map(TrackId::new))
                .collect(),
            next_page: page.next,
        })
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, ApiError> {
        let url = match page_token {
            Some(next) => next.to_string(),
            None => format!(
                "{uri}/playlists/{id}/tracks?limit={limit}&fields=items(is_local,track(id,type,is_local)),next",
                uri = self.api_url,
                id = playlist_id,
                limit = PLAYLIST_PAGE_LIMIT
            ),
        };

        let page: Paging<PlaylistItem> = self.get_json(&url).await?;
        Ok(TrackPage {
            entries: page.items.into_iter().map(playable_track).collect(),
            next_page: page.next,
        })
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<(), ApiError> {
        let url = format!(
            "{uri}/playlists/{id}/tracks",
            uri = self.api_url,
            id = playlist_id
        );
        let body = AddTrackToPlaylistRequest {
            uris: track_ids.iter().map(TrackId::uri).collect(),
        };

        let response = self.authorized(self.http.post(&url).json(&body)).await?;
        let snapshot = response.json::<AddTrackToPlaylistResponse>().await?;
        debug!(playlist_id, snapshot_id = %snapshot.snapshot_id, "playlist updated");
        Ok(())
    }
}

fn playable_track(item: PlaylistItem) -> Option<TrackId> {
    if item.is_local {
        return None;
    }
    let track = item.track?;
    if track.is_local || track.kind.as_deref().is_some_and(|k| k != "track") {
        return None;
    }
    track.id.map(TrackId::new)
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();

    Err(match status {
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => ApiError::NotFound(url),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Auth(format!("{status}: {body}"))
        }
        s if s.is_server_error() => ApiError::Unavailable(format!("{status} from {url}")),
        _ => ApiError::Rejected(format!("{status}: {body}")),
    })
}

use async_trait::async_trait;

use crate::{error::ApiError, sync::TrackId};

/// One page of a paginated track listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackPage {
    /// `None` marks an entry that is no longer playable as a track
    /// (removed, local file, podcast episode).
    pub entries: Vec<Option<TrackId>>,
    pub next_page: Option<String>,
}

/// The remote streaming service, as far as the sync engine needs it.
///
/// Implementations report failures through [`ApiError`]; retries and
/// timeouts are applied by the caller.
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// Follows a short link. `Ok(None)` means the link leads nowhere.
    async fn resolve_short_link(&self, url: &str) -> Result<Option<String>, ApiError>;

    async fn album_tracks(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, ApiError>;

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, ApiError>;

    /// Appends at most [`COMMIT_LIMIT`](crate::sync::COMMIT_LIMIT) tracks.
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<(), ApiError>;
}

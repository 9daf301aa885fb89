#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use playrelay::{
    error::ApiError,
    sync::{MusicApi, RetryPolicy, SyncSettings, TrackId, TrackPage},
};
use tokio::sync::{Mutex, Semaphore};

pub const TARGET: &str = "target";

/// Listing of one album or playlist, already split into pages.
pub type Pages = Vec<Vec<Option<TrackId>>>;

/// In-memory stand-in for the streaming service.
#[derive(Default)]
pub struct FakeApi {
    pub albums: Mutex<HashMap<String, Pages>>,
    pub playlists: Mutex<HashMap<String, Pages>>,
    pub short_links: Mutex<HashMap<String, String>>,
    /// Short links whose resolution always fails transiently
    pub broken_links: Mutex<HashSet<String>>,
    /// Any add call containing one of these ids fails transiently
    pub poisoned: Mutex<HashSet<TrackId>>,
    /// Playlist listings fail transiently while set
    pub playlist_outage: Mutex<bool>,
    pub add_calls: Mutex<Vec<Vec<TrackId>>>,
    pub add_attempts: AtomicUsize,
    pub link_attempts: AtomicUsize,
    pub membership_fetches: AtomicUsize,
    /// When present, every add call waits for a permit first
    pub add_gate: Option<Arc<Semaphore>>,
}

pub fn ids(raw: &[&str]) -> Vec<TrackId> {
    raw.iter().map(|id| TrackId::new(*id)).collect()
}

pub fn page(raw: &[&str]) -> Vec<Option<TrackId>> {
    raw.iter().map(|id| Some(TrackId::new(*id))).collect()
}

/// `count` distinct ids starting with `prefix`.
pub fn generated(prefix: &str, count: usize) -> Vec<Option<TrackId>> {
    (0..count)
        .map(|i| Some(TrackId::new(format!("{prefix}{i:04}"))))
        .collect()
}

pub fn fast_settings() -> SyncSettings {
    SyncSettings {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            call_timeout: Duration::from_secs(5),
        },
        lock_timeout: Duration::from_secs(5),
        max_pending_events: 8,
        cache_max_age: None,
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            add_gate: Some(gate),
            ..Self::default()
        }
    }

    pub async fn with_target(self, pages: Pages) -> Self {
        self.playlists.lock().await.insert(TARGET.to_string(), pages);
        self
    }

    pub async fn with_album(self, id: &str, pages: Pages) -> Self {
        self.albums.lock().await.insert(id.to_string(), pages);
        self
    }

    pub async fn with_playlist(self, id: &str, pages: Pages) -> Self {
        self.playlists.lock().await.insert(id.to_string(), pages);
        self
    }

    pub async fn with_short_link(self, link: &str, target: &str) -> Self {
        self.short_links
            .lock()
            .await
            .insert(link.to_string(), target.to_string());
        self
    }

    pub async fn with_broken_link(self, link: &str) -> Self {
        self.broken_links.lock().await.insert(link.to_string());
        self
    }

    pub async fn poison(&self, id: &str) {
        self.poisoned.lock().await.insert(TrackId::new(id));
    }

    pub async fn committed(&self) -> Vec<Vec<TrackId>> {
        self.add_calls.lock().await.clone()
    }

    pub async fn target_tracks(&self) -> Vec<TrackId> {
        self.playlists
            .lock()
            .await
            .get(TARGET)
            .map(|pages| pages.iter().flatten().flatten().cloned().collect())
            .unwrap_or_default()
    }

    fn page_of(pages: &Pages, token: Option<&str>) -> Result<TrackPage, ApiError> {
        let index: usize = token.map_or(Ok(0), |t| {
            t.parse()
                .map_err(|_| ApiError::Rejected(format!("bad page token {t}")))
        })?;
        let entries = pages.get(index).cloned().unwrap_or_default();
        let next_page = (index + 1 < pages.len()).then(|| (index + 1).to_string());
        Ok(TrackPage { entries, next_page })
    }
}

#[async_trait]
impl MusicApi for FakeApi {
    async fn resolve_short_link(&self, url: &str) -> Result<Option<String>, ApiError> {
        self.link_attempts.fetch_add(1, Ordering::SeqCst);
        let link = url.trim_start_matches("https://");
        if self.broken_links.lock().await.contains(link) {
            return Err(ApiError::Unavailable("connection reset".to_string()));
        }
        Ok(self.short_links.lock().await.get(link).cloned())
    }

    async fn album_tracks(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, ApiError> {
        let albums = self.albums.lock().await;
        let pages = albums
            .get(album_id)
            .ok_or_else(|| ApiError::NotFound(album_id.to_string()))?;
        Self::page_of(pages, page_token)
    }

    async fn playlist_tracks(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<TrackPage, ApiError> {
        if *self.playlist_outage.lock().await {
            return Err(ApiError::Unavailable("503".to_string()));
        }
        if playlist_id == TARGET && page_token.is_none() {
            self.membership_fetches.fetch_add(1, Ordering::SeqCst);
        }
        let playlists = self.playlists.lock().await;
        match playlists.get(playlist_id) {
            Some(pages) => Self::page_of(pages, page_token),
            None if playlist_id == TARGET => Ok(TrackPage::default()),
            None => Err(ApiError::NotFound(playlist_id.to_string())),
        }
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId]) -> Result<(), ApiError> {
        self.add_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.add_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| ApiError::Unavailable("gate closed".to_string()))?;
        }
        tokio::task::yield_now().await;

        assert!(track_ids.len() <= playrelay::sync::COMMIT_LIMIT);
        let poisoned = self.poisoned.lock().await;
        if track_ids.iter().any(|id| poisoned.contains(id)) {
            return Err(ApiError::Unavailable("502 Bad Gateway".to_string()));
        }
        drop(poisoned);

        self.add_calls.lock().await.push(track_ids.to_vec());
        self.playlists
            .lock()
            .await
            .entry(playlist_id.to_string())
            .or_default()
            .push(track_ids.iter().cloned().map(Some).collect());
        Ok(())
    }
}

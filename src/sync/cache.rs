use std::{collections::HashSet, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    error::ApiError,
    sync::{MusicApi, RetryPolicy, TrackId},
};

/// Track identifiers believed to be on a playlist as of `fetched_at`,
/// plus every addition this process has confirmed since.
#[derive(Debug, Clone)]
pub struct MembershipSnapshot {
    pub playlist_id: String,
    pub track_ids: HashSet<TrackId>,
    pub fetched_at: DateTime<Utc>,
}

/// Cached membership of one target playlist.
///
/// The snapshot is either absent or complete; a failed fetch never leaves
/// a partial set behind.
#[derive(Debug)]
pub struct MembershipCache {
    playlist_id: String,
    max_age: Option<Duration>,
    snapshot: Option<MembershipSnapshot>,
}

impl MembershipCache {
    pub fn new(playlist_id: impl Into<String>, max_age: Option<Duration>) -> Self {
        Self {
            playlist_id: playlist_id.into(),
            max_age,
            snapshot: None,
        }
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    pub fn snapshot(&self) -> Option<&MembershipSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn len(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.track_ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches the full playlist unless a fresh snapshot is already held.
    pub async fn ensure_loaded(
        &mut self,
        api: &dyn MusicApi,
        retry: &RetryPolicy,
    ) -> Result<(), ApiError> {
        if self.is_stale() {
            debug!(playlist_id = %self.playlist_id, "membership snapshot expired");
            self.invalidate();
        }
        if self.snapshot.is_some() {
            return Ok(());
        }

        let fetched_at = Utc::now();
        let mut track_ids = HashSet::new();
        let mut token: Option<String> = None;
        loop {
            let page = retry
                .run("fetch playlist membership", || {
                    api.playlist_tracks(&self.playlist_id, token.as_deref())
                })
                .await?;
            track_ids.extend(page.entries.into_iter().flatten());
            match page.next_page {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!(
            playlist_id = %self.playlist_id,
            tracks = track_ids.len(),
            "loaded playlist membership"
        );
        self.snapshot = Some(MembershipSnapshot {
            playlist_id: self.playlist_id.clone(),
            track_ids,
            fetched_at,
        });
        Ok(())
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|s| s.track_ids.contains(id))
    }

    /// Records identifiers whose addition the remote side confirmed.
    ///
    /// Does nothing while no snapshot is held; the next load picks them up.
    pub fn record_added<'a>(&mut self, ids: impl IntoIterator<Item = &'a TrackId>) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.track_ids.extend(ids.into_iter().cloned());
        }
    }

    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    fn is_stale(&self) -> bool {
        let (Some(snapshot), Some(max_age)) = (&self.snapshot, self.max_age) else {
            return false;
        };
        let age = Utc::now().signed_duration_since(snapshot.fetched_at);
        age.to_std().is_ok_and(|age| age >= max_age)
    }
}

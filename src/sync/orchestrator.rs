use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, Semaphore},
    time::timeout,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{ApiError, SyncError},
    sync::{
        BatchCommitter, Deduplicator, EntityKind, EntityReference, MembershipCache, MusicApi,
        ReferenceExtractor, ReferenceResolver, RetryPolicy, SyncResult, TrackId,
        outcome::{Failure, FailureReason},
    },
};

/// Tunables for a [`SyncOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub retry: RetryPolicy,
    /// How long a run may wait for its playlist before giving up
    pub lock_timeout: Duration,
    /// Runs allowed to wait on or hold one playlist at the same time
    pub max_pending_events: usize,
    /// Snapshots older than this are fetched again
    pub cache_max_age: Option<Duration>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            lock_timeout: Duration::from_secs(30),
            max_pending_events: 32,
            cache_max_age: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Idle,
    Extracting,
    Resolving,
    Deduplicating,
    Committing,
    Done,
}

/// Serialization slot for one target playlist.
struct PlaylistSlot {
    cache: Mutex<MembershipCache>,
    pending: Semaphore,
}

/// Runs the full relay pipeline for inbound chat events.
///
/// Runs targeting the same playlist are serialized; the membership cache
/// of a playlist is only touched while its slot is held.
pub struct SyncOrchestrator {
    api: Arc<dyn MusicApi>,
    target_playlist: String,
    settings: SyncSettings,
    extractor: ReferenceExtractor,
    resolver: ReferenceResolver,
    slots: Mutex<HashMap<String, Arc<PlaylistSlot>>>,
}

impl SyncOrchestrator {
    /// `max_pending_events` is clamped to what a semaphore can hold.
    pub fn new(
        api: Arc<dyn MusicApi>,
        target_playlist: impl Into<String>,
        mut settings: SyncSettings,
    ) -> Self {
        settings.max_pending_events = settings
            .max_pending_events
            .clamp(1, Semaphore::MAX_PERMITS);
        Self {
            extractor: ReferenceExtractor::new(Arc::clone(&api), settings.retry),
            resolver: ReferenceResolver::new(Arc::clone(&api), settings.retry),
            api,
            target_playlist: target_playlist.into(),
            settings,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn target_playlist(&self) -> &str {
        &self.target_playlist
    }

    /// Processes one chat message against the configured target playlist.
    pub async fn process_event(&self, chat_id: i64, text: &str) -> Result<SyncResult, SyncError> {
        self.sync_into(&self.target_playlist, chat_id, text).await
    }

    /// Drops the cached membership of `playlist_id`; the next run re-fetches it.
    pub async fn invalidate(&self, playlist_id: &str) -> Result<(), SyncError> {
        let slot = self.slot(playlist_id).await;
        let mut cache = timeout(self.settings.lock_timeout, slot.cache.lock())
            .await
            .map_err(|_| SyncError::LockTimeout {
                playlist_id: playlist_id.to_string(),
                waited: self.settings.lock_timeout,
            })?;
        cache.invalidate();
        info!(playlist_id, "membership snapshot invalidated");
        Ok(())
    }

    #[instrument(skip(self, text))]
    pub async fn sync_into(
        &self,
        playlist_id: &str,
        chat_id: i64,
        text: &str,
    ) -> Result<SyncResult, SyncError> {
        let slot = self.slot(playlist_id).await;

        let _permit = slot
            .pending
            .try_acquire()
            .map_err(|_| SyncError::QueueFull {
                playlist_id: playlist_id.to_string(),
                limit: self.settings.max_pending_events,
            })?;

        let mut cache = timeout(self.settings.lock_timeout, slot.cache.lock())
            .await
            .map_err(|_| SyncError::LockTimeout {
                playlist_id: playlist_id.to_string(),
                waited: self.settings.lock_timeout,
            })?;

        let mut result = SyncResult::default();
        let mut phase = RunPhase::Idle;

        advance(&mut phase, RunPhase::Extracting);
        let extraction = self.extractor.extract(text).await;
        result.failures.extend(extraction.failures);

        if extraction.references.is_empty() {
            advance(&mut phase, RunPhase::Done);
            return Ok(result);
        }

        cache
            .ensure_loaded(self.api.as_ref(), &self.settings.retry)
            .await
            .map_err(|source| SyncError::Membership {
                playlist_id: playlist_id.to_string(),
                source,
            })?;

        let mut dedup = Deduplicator::new();
        let mut accepted: Vec<TrackId> = Vec::new();

        for reference in &extraction.references {
            if is_self_reference(reference, playlist_id) {
                warn!(reference = %reference, "ignoring reference to the target playlist itself");
                result.skipped_invalid += 1;
                continue;
            }

            let mut pager = self.resolver.pages(reference);
            loop {
                advance(&mut phase, RunPhase::Resolving);
                let Some(page) = pager.next_page().await else {
                    break;
                };
                match page {
                    Ok(entries) => {
                        let before = entries.len();
                        let tracks: Vec<TrackId> = entries.into_iter().flatten().collect();
                        result.skipped_invalid += before - tracks.len();
                        advance(&mut phase, RunPhase::Deduplicating);
                        accepted.extend(dedup.filter(tracks, &cache));
                    }
                    Err(err) => {
                        warn!(reference = %reference, error = %err, "could not resolve reference");
                        result.failures.push(Failure::new(reference, failure_reason(&err)));
                    }
                }
            }
        }
        result.skipped_duplicates = dedup.skipped();

        advance(&mut phase, RunPhase::Committing);
        BatchCommitter::new(self.api.as_ref(), &self.settings.retry)
            .commit(&accepted, &mut cache, &mut result)
            .await;

        advance(&mut phase, RunPhase::Done);
        info!(
            chat_id,
            references = extraction.references.len(),
            added = result.added.len(),
            skipped_duplicates = result.skipped_duplicates,
            skipped_invalid = result.skipped_invalid,
            failures = result.failures.len(),
            "run finished"
        );
        Ok(result)
    }

    async fn slot(&self, playlist_id: &str) -> Arc<PlaylistSlot> {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(playlist_id.to_string()).or_insert_with(|| {
            Arc::new(PlaylistSlot {
                cache: Mutex::new(MembershipCache::new(
                    playlist_id,
                    self.settings.cache_max_age,
                )),
                pending: Semaphore::new(self.settings.max_pending_events),
            })
        });
        Arc::clone(slot)
    }
}

fn advance(current: &mut RunPhase, next: RunPhase) {
    if *current != next {
        debug!(from = ?*current, to = ?next, "run phase");
        *current = next;
    }
}

fn is_self_reference(reference: &EntityReference, playlist_id: &str) -> bool {
    reference.kind == EntityKind::Playlist && reference.id == playlist_id
}

fn failure_reason(err: &ApiError) -> FailureReason {
    match err {
        ApiError::NotFound(_) => FailureReason::NotFound,
        _ => FailureReason::Unavailable,
    }
}

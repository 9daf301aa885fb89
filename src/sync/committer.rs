use tracing::{info, warn};

use crate::sync::{
    MembershipCache, MusicApi, RetryPolicy, SyncResult, TrackId,
    outcome::{Failure, FailureReason},
};

/// Most tracks the remote side accepts in one "add tracks" call.
pub const COMMIT_LIMIT: usize = 100;

/// Writes accepted tracks to the target playlist in bounded chunks.
pub struct BatchCommitter<'a> {
    api: &'a dyn MusicApi,
    retry: &'a RetryPolicy,
}

impl<'a> BatchCommitter<'a> {
    pub fn new(api: &'a dyn MusicApi, retry: &'a RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Commits `accepted` chunk by chunk, in order.
    ///
    /// Each confirmed chunk is recorded in `cache` and appended to
    /// `result.added` before the next chunk is sent. A chunk that still
    /// fails after retries is reported as `commit_failed` and the
    /// remaining chunks are attempted anyway.
    pub async fn commit(
        &self,
        accepted: &[TrackId],
        cache: &mut MembershipCache,
        result: &mut SyncResult,
    ) {
        let playlist_id = cache.playlist_id().to_string();
        let chunks = accepted.len().div_ceil(COMMIT_LIMIT);

        for (index, chunk) in accepted.chunks(COMMIT_LIMIT).enumerate() {
            let outcome = self
                .retry
                .run("add tracks", || self.api.add_tracks(&playlist_id, chunk))
                .await;

            match outcome {
                Ok(()) => {
                    cache.record_added(chunk);
                    result.added.extend_from_slice(chunk);
                    info!(
                        playlist_id = %playlist_id,
                        chunk = index + 1,
                        chunks,
                        tracks = chunk.len(),
                        "added tracks to playlist"
                    );
                }
                Err(err) => {
                    warn!(
                        playlist_id = %playlist_id,
                        chunk = index + 1,
                        chunks,
                        error = %err,
                        "giving up on chunk"
                    );
                    result.failures.extend(
                        chunk
                            .iter()
                            .map(|id| Failure::new(id.uri(), FailureReason::CommitFailed)),
                    );
                }
            }
        }
    }
}

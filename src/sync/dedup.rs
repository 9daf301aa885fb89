use std::collections::HashSet;

use crate::sync::{MembershipCache, TrackId};

/// Stable filter that drops tracks already on the playlist or already
/// accepted earlier in the same run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    accepted: HashSet<TrackId>,
    skipped: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidates not yet on the playlist nor accepted in this
    /// run, in first-seen order.
    pub fn filter(
        &mut self,
        candidates: impl IntoIterator<Item = TrackId>,
        cache: &MembershipCache,
    ) -> Vec<TrackId> {
        candidates
            .into_iter()
            .filter(|id| {
                if cache.contains(id) || self.accepted.contains(id) {
                    self.skipped += 1;
                    return false;
                }
                self.accepted.insert(id.clone());
                true
            })
            .collect()
    }

    /// Candidates dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
}

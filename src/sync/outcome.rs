use std::fmt;

use serde::Serialize;

use crate::sync::TrackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The reference resolved to nothing on the remote side
    NotFound,
    /// Transient remote errors outlasted the retry budget
    Unavailable,
    /// A batch could not be written to the target playlist
    CommitFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureReason::NotFound => "not_found",
            FailureReason::Unavailable => "unavailable",
            FailureReason::CommitFailed => "commit_failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub reference: String,
    pub reason: FailureReason,
}

impl Failure {
    pub fn new(reference: impl fmt::Display, reason: FailureReason) -> Self {
        Self {
            reference: reference.to_string(),
            reason,
        }
    }
}

/// Outcome of one run, handed back to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub added: Vec<TrackId>,
    pub skipped_duplicates: usize,
    pub skipped_invalid: usize,
    pub failures: Vec<Failure>,
}

impl SyncResult {
    /// Nothing was found to act on.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.skipped_duplicates == 0
            && self.skipped_invalid == 0
            && self.failures.is_empty()
    }

    pub fn failures_with(&self, reason: FailureReason) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.reason == reason)
    }
}

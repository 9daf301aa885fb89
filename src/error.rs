//! Error types shared across the relay.
//!
//! - [`ApiError`]: failures reported by a [`MusicApi`](crate::sync::MusicApi)
//!   implementation. The retry policy only retries the transient ones.
//! - [`SyncError`]: run-level failures that abort a run before any work
//!   begins (or before any commit, for [`SyncError::Membership`]).
//! - [`ConfigError`]: missing or malformed configuration values.

use std::time::Duration;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The referenced entity does not exist on the remote side
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote side asked us to slow down
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Server-side or network failure
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the configured bound
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials were refused or could not be obtained
    #[error("authorization failed: {0}")]
    Auth(String),

    /// The request was understood but refused
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. } | ApiError::Unavailable(_) | ApiError::Timeout(_)
        )
    }

    /// Server-provided wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::Unavailable(format!("request timed out: {}", err.without_url()));
        }
        if err.is_decode() {
            return ApiError::Rejected(format!("malformed response: {err}"));
        }
        ApiError::Unavailable(err.to_string())
    }
}

/// A run that could not be carried out at all.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("timed out after {waited:?} waiting for playlist {playlist_id}")]
    LockTimeout {
        playlist_id: String,
        waited: Duration,
    },

    #[error("too many pending events for playlist {playlist_id} (limit {limit})")]
    QueueFull { playlist_id: String, limit: usize },

    #[error("could not load membership of playlist {playlist_id}: {source}")]
    Membership {
        playlist_id: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

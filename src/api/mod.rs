//! # API Module
//!
//! HTTP endpoints served by the relay:
//!
//! - [`webhook`] - `POST /webhook`, receives Telegram updates and feeds
//!   allowed chats into the [`SyncOrchestrator`](crate::sync::SyncOrchestrator).
//! - [`health`] - `GET /health`, status and version for monitoring.
//! - [`callback`] - OAuth redirect target used while `playrelay auth` runs.

mod callback;
mod health;
mod webhook;

use axum::{
    Router,
    routing::{get, post},
};

pub use callback::{CallbackState, callback};
pub use health::health;
pub use webhook::{
    GREETING, RecentUpdates, WebhookState, confirmation_text, failure_text, run_error_text,
    webhook,
};

/// Router for `serve`.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .with_state(state)
}

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::SyncError,
    sync::{FailureReason, SyncOrchestrator, SyncResult},
    telegram::TelegramClient,
    types::{Message, Update},
    utils,
};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
const RECENT_UPDATES: usize = 1024;

pub const GREETING: &str = "Hi! I add Spotify tracks, albums and playlists shared in this chat \
to our playlist, each track only once. Just post the links; I work quietly in the background.";

#[derive(Clone)]
pub struct WebhookState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub telegram: Arc<TelegramClient>,
    pub config: Arc<Config>,
    pub recent: Arc<Mutex<RecentUpdates>>,
}

impl WebhookState {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        telegram: Arc<TelegramClient>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            orchestrator,
            telegram,
            config,
            recent: Arc::new(Mutex::new(RecentUpdates::new(RECENT_UPDATES))),
        }
    }
}

/// Remembers the most recent update ids to drop redeliveries early.
#[derive(Debug)]
pub struct RecentUpdates {
    capacity: usize,
    order: VecDeque<i64>,
    seen: HashSet<i64>,
}

impl RecentUpdates {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// `true` the first time an id is offered while it is remembered.
    pub fn first_time(&mut self, update_id: i64) -> bool {
        if !self.seen.insert(update_id) {
            return false;
        }
        self.order.push_back(update_id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

/// Telegram webhook endpoint.
///
/// Always acknowledges well-authenticated deliveries, even ones we cannot
/// use, so Telegram does not keep redelivering them.
pub async fn webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    if let Some(secret) = &state.config.webhook_secret {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(secret.as_str()) {
            warn!("rejected webhook call with a missing or wrong secret");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "status": "unauthorized" })),
            );
        }
    }

    let ok = (StatusCode::OK, Json(json!({ "status": "ok" })));

    let update: Update = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            error!("Error processing webhook update: {}", e);
            return ok;
        }
    };

    if !state.recent.lock().await.first_time(update.update_id) {
        debug!(update_id = update.update_id, "ignoring redelivered update");
        return ok;
    }

    let Some(message) = update.into_message() else {
        return ok;
    };
    if !state.config.is_allowed_chat(message.chat.id) {
        debug!(chat_id = message.chat.id, "ignoring message from chat not on the allow list");
        return ok;
    }

    tokio::spawn(handle_message(state, message));
    ok
}

async fn handle_message(state: WebhookState, message: Message) {
    let Some(text) = message.body() else {
        return;
    };
    let chat_id = message.chat.id;

    match utils::bot_command(text) {
        Some("start") => {
            reply(&state, &message, GREETING).await;
            return;
        }
        Some("refresh") => {
            let target = state.orchestrator.target_playlist().to_string();
            let answer = match state.orchestrator.invalidate(&target).await {
                Ok(()) => "Playlist contents will be reloaded on the next link.".to_string(),
                Err(e) => format!("Could not refresh right now: {e}"),
            };
            reply(&state, &message, &answer).await;
            return;
        }
        Some(other) => {
            debug!(command = other, "ignoring unknown command");
            return;
        }
        None => {}
    }

    match state.orchestrator.process_event(chat_id, text).await {
        Ok(result) => {
            if state.config.enable_confirmation_messages {
                if let Some(text) = confirmation_text(&result) {
                    reply(&state, &message, &text).await;
                }
            }
            if state.config.enable_error_messages {
                if let Some(text) = failure_text(&result) {
                    reply(&state, &message, &text).await;
                }
            }
        }
        Err(e) => {
            error!(chat_id, error = %e, "run aborted");
            if state.config.enable_error_messages {
                reply(&state, &message, &run_error_text(&e)).await;
            }
        }
    }
}

async fn reply(state: &WebhookState, message: &Message, text: &str) {
    if let Err(e) = state
        .telegram
        .send_message(message.chat.id, text, Some(message.message_id))
        .await
    {
        warn!(chat_id = message.chat.id, "could not reply: {}", e);
    } else {
        info!(chat_id = message.chat.id, "replied");
    }
}

/// Summary of what a run changed, or `None` if it saw nothing to add.
pub fn confirmation_text(result: &SyncResult) -> Option<String> {
    let added = result.added.len();
    let dupes = result.skipped_duplicates;
    match (added, dupes) {
        (0, 0) => None,
        (0, d) => Some(format!("{} already in the playlist.", tracks(d))),
        (a, 0) => Some(format!("Added {} to the playlist!", tracks(a))),
        (a, d) => Some(format!(
            "Added {} to the playlist! {} already there.",
            tracks(a),
            tracks(d)
        )),
    }
}

/// Human readable list of the failures of a run, if any.
pub fn failure_text(result: &SyncResult) -> Option<String> {
    if result.failures.is_empty() {
        return None;
    }

    let mut lines = Vec::new();
    let not_found: Vec<_> = result.failures_with(FailureReason::NotFound).collect();
    if !not_found.is_empty() {
        lines.push(format!(
            "Could not find: {}",
            not_found
                .iter()
                .map(|f| f.reference.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    let unavailable = result.failures_with(FailureReason::Unavailable).count();
    if unavailable > 0 {
        lines.push(format!(
            "Spotify did not answer for {unavailable} link(s), please try again later."
        ));
    }
    let failed = result.failures_with(FailureReason::CommitFailed).count();
    if failed > 0 {
        lines.push(format!("Could not add {} to the playlist.", tracks(failed)));
    }
    Some(lines.join("\n"))
}

pub fn run_error_text(err: &SyncError) -> String {
    match err {
        SyncError::LockTimeout { .. } | SyncError::QueueFull { .. } => {
            "Too busy to handle this message right now, please post it again in a moment."
                .to_string()
        }
        SyncError::Membership { .. } => {
            "Could not read the playlist from Spotify, nothing was added. Please try again later."
                .to_string()
        }
    }
}

fn tracks(n: usize) -> String {
    if n == 1 {
        "1 track".to_string()
    } else {
        format!("{n} tracks")
    }
}

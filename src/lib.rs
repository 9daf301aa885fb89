//! Telegram to Spotify playlist relay.
//!
//! This library turns Spotify links posted in chat into additions to a
//! shared playlist, adding every track at most once even when chat events
//! are redelivered or arrive concurrently.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints (Telegram webhook, health, OAuth callback)
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error types
//! - `management` - Persisted OAuth token handling
//! - `server` - HTTP server bootstrap
//! - `spotify` - Spotify Web API client and authorization flow
//! - `sync` - Reference resolution and playlist synchronization engine
//! - `telegram` - Telegram Bot API client
//! - `types` - Wire format data structures
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use playrelay::sync::{SyncOrchestrator, SyncSettings};
//!
//! async fn relay(api: Arc<dyn playrelay::sync::MusicApi>) {
//!     let orchestrator = SyncOrchestrator::new(api, "target-playlist", SyncSettings::default());
//!     let result = orchestrator
//!         .process_event(42, "check this out open.spotify.com/track/AAA")
//!         .await;
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod sync;
pub mod telegram;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the binary-facing plumbing (server bootstrap, authorization
/// flow) where errors of different kinds only need to be reported.
/// Library code returns the typed errors from [`error`].
///
/// # Example
///
/// ```
/// use playrelay::Res;
///
/// async fn fetch_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational line prefixed with a blue `o`.
///
/// Used for interactive command output; the service path logs via `tracing`.
///
/// ```
/// info!("Checking {} variables", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a green `✓` line for a completed step.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a red `!` line and exits with status 1.
///
/// Only for unrecoverable command-line errors; nothing after it runs.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a yellow `!` line for a problem the user should look at.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

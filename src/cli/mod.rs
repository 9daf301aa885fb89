//! # CLI Module
//!
//! User-facing subcommands of the `playrelay` binary:
//!
//! - [`serve`] - registers the Telegram webhook and runs the relay
//! - [`auth`] - authorizes the Spotify account that owns the target playlist
//! - [`verify`] - checks configuration and stored credentials before deploying
//!
//! Fatal problems are reported with the crate's `error!` macro, which exits
//! the process; the long-running `serve` path logs through `tracing`.

mod auth;
mod serve;
mod verify;

pub use auth::auth;
pub use serve::serve;
pub use verify::{is_placeholder, verify};

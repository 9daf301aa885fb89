//! # Spotify Integration Module
//!
//! Binding of the sync engine to the Spotify Web API.
//!
//! - [`client`] - [`SpotifyClient`], the [`MusicApi`](crate::sync::MusicApi)
//!   implementation: paged album and playlist listings, short link
//!   resolution and playlist additions.
//! - [`auth`] - OAuth 2.0 PKCE flow that obtains the token `serve` uses.
//!
//! ## Endpoints
//!
//! - `GET /albums/{id}/tracks` - album listing, 50 per page
//! - `GET /playlists/{id}/tracks` - playlist listing, 100 per page
//! - `POST /playlists/{id}/tracks` - add up to 100 tracks
//! - `POST /api/token` - code exchange and refresh
//!
//! ## Error mapping
//!
//! Responses are classified into [`ApiError`](crate::error::ApiError)
//! variants; `429` carries the `Retry-After` hint and `5xx` or network
//! failures are transient. Retrying is left to the caller's
//! [`RetryPolicy`](crate::sync::RetryPolicy).

pub mod auth;
pub mod client;

pub use client::SpotifyClient;

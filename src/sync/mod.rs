//! # Sync Engine
//!
//! Turns chat messages into playlist additions. A run takes the text of one
//! message through these stages:
//!
//! ```text
//! text ─► ReferenceExtractor ─► ReferenceResolver (per reference, paged)
//!      ─► Deduplicator (MembershipCache + in-run set) ─► BatchCommitter
//!      ─► SyncResult
//! ```
//!
//! [`SyncOrchestrator`] owns one [`MembershipCache`] per target playlist and
//! serializes runs per playlist, so redelivered or concurrent events never
//! add the same track twice.
//!
//! The remote service is abstracted behind [`MusicApi`]; every remote call
//! goes through a [`RetryPolicy`].

mod api;
mod cache;
mod committer;
mod dedup;
mod orchestrator;
pub mod outcome;
mod reference;
mod resolver;
mod retry;

pub use api::{MusicApi, TrackPage};
pub use cache::{MembershipCache, MembershipSnapshot};
pub use committer::{BatchCommitter, COMMIT_LIMIT};
pub use dedup::Deduplicator;
pub use orchestrator::{SyncOrchestrator, SyncSettings};
pub use outcome::{Failure, FailureReason, SyncResult};
pub use reference::{
    EntityKind, EntityReference, Extraction, LinkCandidate, ReferenceExtractor, TrackId,
};
pub use resolver::{ReferenceResolver, TrackPager};
pub use retry::RetryPolicy;

use std::{fmt, sync::Arc, sync::LazyLock};

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::ApiError,
    sync::{
        MusicApi, RetryPolicy,
        outcome::{Failure, FailureReason},
    },
};

// Canonical links first so `spotify.link/track/<id>` is not taken for a short link.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:https?://)?(?:open\.spotify\.com|spotify\.link)/
            (?:intl-[a-z]{2}(?:-[A-Za-z]{2})?/)?(?:embed/)?
            (?P<kind>track|album|playlist|artist|show|episode)/(?P<id>[A-Za-z0-9]+)
            (?:\?\S*)?
        | \bspotify:(?P<ukind>track|album|playlist|artist|show|episode):(?P<uid>[A-Za-z0-9]+)
        | (?P<short>(?:https?://)?(?:spotify\.link|spotify\.app\.link)/[A-Za-z0-9_-]+)
        ",
    )
    .expect("link pattern is valid")
});

/// Opaque identifier of one track on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Track,
    Album,
    Playlist,
}

impl EntityKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "track" => Some(EntityKind::Track),
            "album" => Some(EntityKind::Album),
            "playlist" => Some(EntityKind::Playlist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Track => "track",
            EntityKind::Album => "album",
            EntityKind::Playlist => "playlist",
        }
    }
}

/// A parsed pointer to a track, album or playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityReference {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityReference {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn track(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Track, id)
    }

    pub fn album(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Album, id)
    }

    pub fn playlist(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Playlist, id)
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spotify:{}:{}", self.kind.as_str(), self.id)
    }
}

/// One link found in message text, before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCandidate<'t> {
    Entity(EntityReference),
    ShortLink(&'t str),
}

/// References pulled out of one message, in order of appearance.
#[derive(Debug, Default)]
pub struct Extraction {
    pub references: Vec<EntityReference>,
    pub failures: Vec<Failure>,
}

/// Finds entity references in free-form chat text.
///
/// Scanning is pure and lazy ([`ReferenceExtractor::scan`]); only
/// [`ReferenceExtractor::extract`] touches the network, to follow short
/// links to their canonical target.
#[derive(Clone)]
pub struct ReferenceExtractor {
    api: Arc<dyn MusicApi>,
    retry: RetryPolicy,
}

impl ReferenceExtractor {
    pub fn new(api: Arc<dyn MusicApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Lazily yields every recognized link in `text`, in order.
    ///
    /// Links to kinds we do not expand (artists, shows, episodes) are
    /// skipped. Calling it again on the same text starts over.
    pub fn scan(text: &str) -> impl Iterator<Item = LinkCandidate<'_>> {
        LINK_RE.captures_iter(text).filter_map(|caps| {
            if let Some(short) = caps.name("short") {
                return Some(LinkCandidate::ShortLink(short.as_str()));
            }
            entity_from_captures(&caps).map(LinkCandidate::Entity)
        })
    }

    /// Parses an already canonical URL or URI; `None` if it names nothing we expand.
    pub fn parse_canonical(url: &str) -> Option<EntityReference> {
        LINK_RE
            .captures_iter(url)
            .find_map(|caps| entity_from_captures(&caps))
    }

    pub async fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for candidate in Self::scan(text) {
            match candidate {
                LinkCandidate::Entity(reference) => extraction.references.push(reference),
                LinkCandidate::ShortLink(link) => match self.follow(link).await {
                    Ok(Some(reference)) => extraction.references.push(reference),
                    Ok(None) => debug!(link, "short link does not point at a track, album or playlist"),
                    Err(err) => {
                        let reason = match err {
                            ApiError::NotFound(_) => FailureReason::NotFound,
                            _ => FailureReason::Unavailable,
                        };
                        extraction.failures.push(Failure::new(link, reason));
                    }
                },
            }
        }

        extraction
    }

    async fn follow(&self, link: &str) -> Result<Option<EntityReference>, ApiError> {
        let url = if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("https://{link}")
        };

        let target = self
            .retry
            .run("resolve short link", || self.api.resolve_short_link(&url))
            .await?
            .ok_or_else(|| ApiError::NotFound(url.clone()))?;

        debug!(link, target = %target, "followed short link");
        Ok(Self::parse_canonical(&target))
    }
}

fn entity_from_captures(caps: &Captures<'_>) -> Option<EntityReference> {
    let (kind, id) = match (caps.name("kind"), caps.name("id")) {
        (Some(kind), Some(id)) => (kind, id),
        _ => (caps.name("ukind")?, caps.name("uid")?),
    };
    let kind = EntityKind::parse(kind.as_str())?;
    Some(EntityReference::new(kind, id.as_str()))
}

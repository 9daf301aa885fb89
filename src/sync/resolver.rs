use std::sync::Arc;

use crate::{
    error::ApiError,
    sync::{EntityKind, EntityReference, MusicApi, RetryPolicy, TrackId, TrackPage},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PagerState {
    Fresh,
    Next(String),
    Exhausted,
}

/// Lazy, restartable walk over the track pages of one reference.
///
/// A track reference yields a single page holding itself without any
/// remote call. Album and playlist references fetch one page per
/// [`TrackPager::next_page`] call until the listing is exhausted.
pub struct TrackPager {
    api: Arc<dyn MusicApi>,
    retry: RetryPolicy,
    reference: EntityReference,
    state: PagerState,
}

impl TrackPager {
    pub fn reference(&self) -> &EntityReference {
        &self.reference
    }

    /// Returns `None` once every page has been yielded.
    ///
    /// After an error the pager is exhausted; call [`TrackPager::restart`]
    /// to walk the listing again from the first page.
    pub async fn next_page(&mut self) -> Option<Result<Vec<Option<TrackId>>, ApiError>> {
        let token = match &self.state {
            PagerState::Exhausted => return None,
            PagerState::Fresh => None,
            PagerState::Next(token) => Some(token.clone()),
        };

        let page = match self.reference.kind {
            EntityKind::Track => Ok(TrackPage {
                entries: vec![Some(TrackId::new(self.reference.id.as_str()))],
                next_page: None,
            }),
            EntityKind::Album => {
                let id = self.reference.id.as_str();
                self.retry
                    .run("fetch album tracks", || {
                        self.api.album_tracks(id, token.as_deref())
                    })
                    .await
            }
            EntityKind::Playlist => {
                let id = self.reference.id.as_str();
                self.retry
                    .run("fetch playlist tracks", || {
                        self.api.playlist_tracks(id, token.as_deref())
                    })
                    .await
            }
        };

        match page {
            Ok(page) => {
                self.state = match page.next_page {
                    Some(next) => PagerState::Next(next),
                    None => PagerState::Exhausted,
                };
                Some(Ok(page.entries))
            }
            Err(err) => {
                self.state = PagerState::Exhausted;
                Some(Err(err))
            }
        }
    }

    pub fn restart(&mut self) {
        self.state = PagerState::Fresh;
    }
}

/// Expands references into the track identifiers they stand for.
#[derive(Clone)]
pub struct ReferenceResolver {
    api: Arc<dyn MusicApi>,
    retry: RetryPolicy,
}

impl ReferenceResolver {
    pub fn new(api: Arc<dyn MusicApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    pub fn pages(&self, reference: &EntityReference) -> TrackPager {
        TrackPager {
            api: Arc::clone(&self.api),
            retry: self.retry,
            reference: reference.clone(),
            state: PagerState::Fresh,
        }
    }

    /// Materializes the full expansion of `reference`.
    ///
    /// Unavailable entries are dropped. Prefer [`ReferenceResolver::pages`]
    /// for listings that may be large.
    pub async fn resolve(&self, reference: &EntityReference) -> Result<Vec<TrackId>, ApiError> {
        let mut pager = self.pages(reference);
        let mut tracks = Vec::new();
        while let Some(page) = pager.next_page().await {
            tracks.extend(page?.into_iter().flatten());
        }
        Ok(tracks)
    }
}

mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use common::*;
use playrelay::{
    error::ApiError,
    sync::{
        EntityKind, EntityReference, FailureReason, LinkCandidate, ReferenceExtractor,
        ReferenceResolver, RetryPolicy, TrackId,
    },
};

fn extractor(api: &Arc<FakeApi>) -> ReferenceExtractor {
    ReferenceExtractor::new(Arc::<FakeApi>::clone(api), fast_settings().retry)
}

#[test]
fn test_scan_recognizes_all_link_forms_in_order() {
    let text = "first spotify:album:ALB1 then https://open.spotify.com/intl-de/track/TRK1?si=abc \
                and open.spotify.com/embed/playlist/PL1, finally https://spotify.link/Zx9_q";

    let found: Vec<_> = ReferenceExtractor::scan(text).collect();

    assert_eq!(
        found,
        vec![
            LinkCandidate::Entity(EntityReference::album("ALB1")),
            LinkCandidate::Entity(EntityReference::track("TRK1")),
            LinkCandidate::Entity(EntityReference::playlist("PL1")),
            LinkCandidate::ShortLink("https://spotify.link/Zx9_q"),
        ]
    );
}

#[test]
fn test_scan_skips_kinds_that_are_not_expanded() {
    let text = "open.spotify.com/artist/ART1 open.spotify.com/show/SH1 \
                spotify:episode:EP1 open.spotify.com/track/TRK1";

    let found: Vec<_> = ReferenceExtractor::scan(text).collect();

    assert_eq!(found, vec![LinkCandidate::Entity(EntityReference::track("TRK1"))]);
}

#[test]
fn test_scan_ignores_malformed_and_foreign_links() {
    let text = "open.spotify.com/track/ nope, https://example.com/album/ALB1, \
                open.spotify.com/tracks/TRK1 and music.example.org/playlist/PL1";

    assert_eq!(ReferenceExtractor::scan(text).count(), 0);
    assert_eq!(ReferenceExtractor::scan("").count(), 0);
}

#[test]
fn test_scan_keeps_query_string_with_its_link() {
    let text = "https://open.spotify.com/album/ALB1?highlight=spotify:track:TRK1 \
                open.spotify.com/track/TRK2?si=a&context=spotify:playlist:PL1";

    let found: Vec<_> = ReferenceExtractor::scan(text).collect();

    assert_eq!(
        found,
        vec![
            LinkCandidate::Entity(EntityReference::album("ALB1")),
            LinkCandidate::Entity(EntityReference::track("TRK2")),
        ]
    );
}

#[test]
fn test_scan_requires_uri_to_start_a_word() {
    let text = "xspotify:track:AAA notspotify:album:BBB (spotify:track:CCC)";

    let found: Vec<_> = ReferenceExtractor::scan(text).collect();

    assert_eq!(found, vec![LinkCandidate::Entity(EntityReference::track("CCC"))]);
}

#[test]
fn test_scan_can_be_restarted() {
    let text = "open.spotify.com/track/A1 open.spotify.com/track/B2";

    let first: Vec<_> = ReferenceExtractor::scan(text).collect();
    let second: Vec<_> = ReferenceExtractor::scan(text).collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_parse_canonical() {
    assert_eq!(
        ReferenceExtractor::parse_canonical("https://open.spotify.com/album/ALB1?si=q"),
        Some(EntityReference::album("ALB1"))
    );
    assert_eq!(
        ReferenceExtractor::parse_canonical("spotify:playlist:PL1"),
        Some(EntityReference::playlist("PL1"))
    );
    assert_eq!(
        ReferenceExtractor::parse_canonical("https://open.spotify.com/artist/ART1"),
        None
    );
    assert_eq!(ReferenceExtractor::parse_canonical("https://example.com"), None);
}

#[test]
fn test_reference_display_is_a_uri() {
    let reference = EntityReference::new(EntityKind::Album, "ALB1");
    assert_eq!(reference.to_string(), "spotify:album:ALB1");
    assert_eq!(TrackId::new("TRK1").uri(), "spotify:track:TRK1");
}

#[tokio::test]
async fn test_extract_follows_short_links() {
    let api = Arc::new(
        FakeApi::new()
            .with_short_link("spotify.link/abc", "https://open.spotify.com/playlist/PL1?si=1")
            .await,
    );

    let extraction = extractor(&api)
        .extract("spotify.link/abc and open.spotify.com/track/TRK1")
        .await;

    assert_eq!(
        extraction.references,
        vec![EntityReference::playlist("PL1"), EntityReference::track("TRK1")]
    );
    assert!(extraction.failures.is_empty());
}

#[tokio::test]
async fn test_extract_drops_short_links_to_other_kinds() {
    let api = Arc::new(
        FakeApi::new()
            .with_short_link("spotify.link/art", "https://open.spotify.com/artist/ART1")
            .await,
    );

    let extraction = extractor(&api).extract("https://spotify.link/art").await;

    assert!(extraction.references.is_empty());
    assert!(extraction.failures.is_empty());
}

#[tokio::test]
async fn test_extract_reports_short_link_failures() {
    let api = Arc::new(FakeApi::new().with_broken_link("spotify.link/down").await);

    let extraction = extractor(&api)
        .extract("spotify.link/down spotify.link/missing")
        .await;

    assert!(extraction.references.is_empty());
    assert_eq!(extraction.failures.len(), 2);
    assert_eq!(extraction.failures[0].reference, "spotify.link/down");
    assert_eq!(extraction.failures[0].reason, FailureReason::Unavailable);
    assert_eq!(extraction.failures[1].reason, FailureReason::NotFound);
    // 3 attempts for the broken link, 1 for the missing one
    assert_eq!(api.link_attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_resolver_walks_every_page() {
    let api = Arc::new(
        FakeApi::new()
            .with_album(
                "ALB",
                vec![
                    page(&["A", "B"]),
                    page(&["C"]),
                    vec![None, Some(TrackId::new("D"))],
                ],
            )
            .await,
    );
    let resolver = ReferenceResolver::new(Arc::<FakeApi>::clone(&api), fast_settings().retry);

    let tracks = resolver.resolve(&EntityReference::album("ALB")).await.unwrap();
    assert_eq!(tracks, ids(&["A", "B", "C", "D"]));

    let single = resolver.resolve(&EntityReference::track("T")).await.unwrap();
    assert_eq!(single, ids(&["T"]));
}

#[tokio::test]
async fn test_pager_can_restart_after_error() {
    let api = Arc::new(FakeApi::new());
    let resolver = ReferenceResolver::new(Arc::<FakeApi>::clone(&api), fast_settings().retry);
    let mut pager = resolver.pages(&EntityReference::album("LATE"));

    let first = pager.next_page().await.unwrap();
    assert!(matches!(first, Err(ApiError::NotFound(_))));
    assert!(pager.next_page().await.is_none());

    api.albums
        .lock()
        .await
        .insert("LATE".to_string(), vec![page(&["A"])]);
    pager.restart();
    assert_eq!(pager.next_page().await.unwrap().unwrap(), page(&["A"]));
    assert!(pager.next_page().await.is_none());
}

fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        call_timeout: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn test_retry_stops_on_permanent_error() {
    let calls = &AtomicU32::new(0);

    let result: Result<(), _> = quick_policy(5)
        .run("lookup", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::NotFound("x".to_string()))
        })
        .await;

    assert_eq!(result, Err(ApiError::NotFound("x".to_string())));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_recovers_from_transient_errors() {
    let calls = &AtomicU32::new(0);

    let result = quick_policy(4)
        .run("lookup", move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(ApiError::RateLimited {
                    retry_after: Some(Duration::from_millis(1)),
                }),
                1 => Err(ApiError::Unavailable("503".to_string())),
                _ => Ok(7),
            }
        })
        .await;

    assert_eq!(result, Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_treats_slow_calls_as_timeouts() {
    let calls = &AtomicU32::new(0);

    let result: Result<(), _> = quick_policy(2)
        .run("lookup", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

    assert_eq!(result, Err(ApiError::Timeout(Duration::from_millis(50))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_backoff_is_bounded_and_jittered() {
    let policy = RetryPolicy {
        max_attempts: 6,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(1000),
        call_timeout: Duration::from_secs(1),
    };

    for _ in 0..50 {
        let first = policy.backoff(1);
        assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(100));

        let third = policy.backoff(3);
        assert!(third >= Duration::from_millis(200) && third <= Duration::from_millis(400));

        let late = policy.backoff(30);
        assert!(late >= Duration::from_millis(500) && late <= Duration::from_millis(1000));
    }
}

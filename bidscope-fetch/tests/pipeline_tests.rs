//! Integration tests for the enrichment pipeline over an in-memory transport.

mod common;

use std::sync::Mutex;
use std::time::Duration;

use bidscope_core::NOT_AVAILABLE;
use bidscope_fetch::{
    ApiRequest, DispatchStrategy, EnrichRequest, Enricher, FetchContext, FetchError,
};
use common::{MockTransport, SELF_ID, fixture, http_error, query_id};
use tokio_util::sync::CancellationToken;

fn no_progress(_: u8, _: &str) {}

fn context(transport: std::sync::Arc<MockTransport>) -> FetchContext {
    FetchContext::new(transport)
}

#[tokio::test(start_paused = true)]
async fn test_only_project_threads_are_enriched() {
    let transport = MockTransport::new(fixture).into_arc();
    let ctx = context(transport.clone());

    let outcome = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();

    let ids: Vec<_> = outcome.threads.iter().map(|r| r.thread_id).collect();
    assert_eq!(ids, vec![Some(7), Some(9), Some(10)]);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.rate_limits.limit, "100");
}

#[tokio::test(start_paused = true)]
async fn test_fully_populated_record() {
    let ctx = context(MockTransport::new(fixture).into_arc());

    let outcome = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();
    let record = &outcome.threads[0];

    assert_eq!(record.project_id, Some(100));
    assert_eq!(record.project_title, "Scraper");
    assert_eq!(record.client_username, "acme");
    assert_eq!(record.bid_id, Some(1));
    assert!(record.awarded);
    assert_eq!(record.bid_to_award_time_seconds, Some(500));
    assert_eq!(record.first_message_at, Some(1600));
    assert_eq!(record.response_time_seconds, Some(600));
    assert_eq!(record.time_to_bid_seconds, Some(600));
    assert_eq!(record.price_competitiveness.as_deref(), Some("1.25"));
    assert!((record.total_paid_milestones - 10.5).abs() < f64::EPSILON);
    assert_eq!(record.milestone_count, 2);
    assert_eq!(record.error, None);
}

#[tokio::test(start_paused = true)]
async fn test_missing_client_degrades_one_record() {
    let ctx = context(MockTransport::new(fixture).into_arc());

    let outcome = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();
    let record = &outcome.threads[1];

    let error = record.error.as_deref().unwrap();
    assert!(error.contains("Client not found."));
    assert!(!error.contains("Project not found"));
    assert!(!error.contains("Secret"));
    assert_eq!(record.client_username, NOT_AVAILABLE);
    assert_eq!(record.thread_id, Some(9));
    assert_eq!(record.project_id, Some(200));
    assert_eq!(outcome.failures, 1);

    let lost = &outcome.threads[2];
    assert!(!lost.awarded);
    assert_eq!(lost.other_status, "rejected");
    assert_eq!(lost.client_username, "globex");
    assert_eq!(lost.project_type, "hourly");
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_monotonic_and_ends_at_100_once() {
    let ctx = context(MockTransport::new(fixture).into_arc());
    let seen = Mutex::new(Vec::new());
    let progress = |percent: u8, _: &str| seen.lock().unwrap().push(percent);

    Enricher::new(&ctx)
        .enrich_threads(&progress, &EnrichRequest::default())
        .await
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.first(), Some(&0));
}

#[tokio::test(start_paused = true)]
async fn test_max_threads_limits_output() {
    let ctx = context(MockTransport::new(fixture).into_arc());
    let request = EnrichRequest {
        max_threads: Some(2),
        ..EnrichRequest::default()
    };

    let outcome = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &request)
        .await
        .unwrap();
    assert_eq!(outcome.threads.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_user_id_when_self_fails() {
    let transport = MockTransport::new(|request: &ApiRequest| {
        if request.path == "/users/0.1/self/" {
            http_error(500, "down")
        } else {
            fixture(request)
        }
    })
    .into_arc();
    let ctx = FetchContext::builder(transport.clone())
        .fallback_user_id(Some(4242))
        .build();

    let outcome = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();

    assert_eq!(outcome.threads.len(), 3);
    let bid_calls = transport.calls_to("/projects/0.1/bids/");
    assert!(!bid_calls.is_empty());
    assert!(
        bid_calls
            .iter()
            .all(|r| query_id(r, "bidders[]") == Some(4242))
    );
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_user_leaves_bid_sentinels() {
    let transport = MockTransport::new(|request: &ApiRequest| {
        if request.path == "/users/0.1/self/" {
            http_error(500, "down")
        } else {
            fixture(request)
        }
    })
    .into_arc();
    let ctx = context(transport.clone());

    let outcome = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();

    let record = &outcome.threads[0];
    assert_eq!(record.bid_id, None);
    assert!(record.error.as_deref().unwrap().contains("bid:"));
    assert_eq!(record.client_username, "acme");
    assert!(transport.calls_to("/projects/0.1/bids/").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_user_id_resolved_once() {
    let transport = MockTransport::new(fixture).into_arc();
    let ctx = context(transport.clone());
    let enricher = Enricher::new(&ctx);

    enricher
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();
    enricher
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();

    assert_eq!(transport.calls_to("/users/0.1/self/").len(), 1);
    assert_eq!(ctx.identity.get(), Some(SELF_ID));

    ctx.identity.invalidate();
    enricher
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();
    assert_eq!(transport.calls_to("/users/0.1/self/").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_output_order_matches_listing_under_concurrency() {
    let transport = MockTransport::new(fixture)
        .with_delay(|request: &ApiRequest| match query_id(request, "projects[]") {
            Some(100) => Duration::from_millis(300),
            _ => Duration::from_millis(10),
        })
        .into_arc();
    let ctx = FetchContext::builder(transport)
        .dispatch(DispatchStrategy::Concurrent { max_in_flight: 3 })
        .build();

    let outcome = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();

    let ids: Vec<_> = outcome.threads.iter().map(|r| r.thread_id).collect();
    assert_eq!(ids, vec![Some(7), Some(9), Some(10)]);
}

#[tokio::test(start_paused = true)]
async fn test_sequential_dispatch_gives_same_rows() {
    let concurrent = context(MockTransport::new(fixture).into_arc());
    let sequential = FetchContext::builder(MockTransport::new(fixture).into_arc())
        .dispatch(DispatchStrategy::Sequential)
        .build();

    let a = Enricher::new(&concurrent)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();
    let b = Enricher::new(&sequential)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap();

    assert_eq!(a.threads, b.threads);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_returns_partial_rows() {
    let ctx = FetchContext::builder(MockTransport::new(fixture).into_arc())
        .dispatch(DispatchStrategy::Sequential)
        .build();
    let cancel = CancellationToken::new();
    let seen = Mutex::new(Vec::new());
    let progress = |percent: u8, _: &str| {
        seen.lock().unwrap().push(percent);
        if percent > 10 {
            cancel.cancel();
        }
    };

    let outcome = Enricher::new(&ctx)
        .enrich_threads_until(&progress, &EnrichRequest::default(), &cancel)
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.threads.len(), 1);
    assert_eq!(outcome.threads[0].thread_id, Some(7));
    assert_eq!(seen.into_inner().unwrap().last(), Some(&100));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_listing() {
    let transport = MockTransport::new(fixture).into_arc();
    let ctx = context(transport.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = Enricher::new(&ctx)
        .enrich_threads_until(&no_progress, &EnrichRequest::default(), &cancel)
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.threads.is_empty());
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_listing_failure_is_fatal() {
    let transport = MockTransport::new(|request: &ApiRequest| {
        if request.path == "/messages/0.1/threads/" {
            http_error(500, "listing down")
        } else {
            fixture(request)
        }
    })
    .into_arc();
    let ctx = context(transport.clone());

    let err = Enricher::new(&ctx)
        .enrich_threads(&no_progress, &EnrichRequest::default())
        .await
        .unwrap_err();

    match err {
        FetchError::Api(api) => {
            assert_eq!(api.status, Some(500));
            assert_eq!(api.message, "listing down");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.calls_to("/messages/0.1/threads/").len(), 3);
}

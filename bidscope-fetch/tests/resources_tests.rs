//! Integration tests for individual resource fetchers.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use bidscope_fetch::resources::{
    ThreadQuery, create_thread, fetch_active_threads, fetch_client_info, fetch_my_user_id,
    send_message,
};
use bidscope_fetch::{ApiRequest, ApiResponse, FetchContext, FetchError, FetchSettings, Method};
use common::{MockTransport, SELF_ID, fixture, http_error, ok, rate_limited};
use serde_json::json;

/// Listing with five threads, one of them a support chat.
fn paged_listing(request: &ApiRequest) -> ApiResponse {
    let offset: usize = request
        .query_value("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    let page = match offset {
        0 => json!([
            {"id": 1, "context": {"type": "project", "id": 11}},
            {"id": 2, "context": {"type": "project", "id": 12}}
        ]),
        2 => json!([
            {"id": 3, "context": {"type": "project", "id": 13}},
            {"id": 4, "context": {"type": "support_chat", "id": 14}}
        ]),
        _ => json!([{"id": 5, "context": {"type": "project", "id": 15}}]),
    };
    ok(json!({"threads": page}))
}

fn paged_context(transport: std::sync::Arc<MockTransport>) -> FetchContext {
    FetchContext::builder(transport)
        .settings(FetchSettings {
            thread_page_size: 2,
            ..FetchSettings::default()
        })
        .build()
}

fn offsets(transport: &MockTransport) -> Vec<String> {
    transport
        .calls()
        .iter()
        .filter_map(|r| r.query_value("offset").map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_listing_pages_until_short_page() {
    let transport = MockTransport::new(paged_listing).into_arc();
    let ctx = paged_context(transport.clone());

    let page = fetch_active_threads(&ctx, &ThreadQuery::default())
        .await
        .unwrap();

    let ids: Vec<_> = page.threads.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 5]);
    assert_eq!(offsets(&transport), vec!["0", "2", "4"]);
    assert!(
        transport
            .calls()
            .iter()
            .all(|r| r.query_value("folders[]") == Some("active"))
    );
    assert_eq!(page.rate_limits.remaining, "99");
}

#[tokio::test]
async fn test_listing_limit_counts_project_threads() {
    let transport = MockTransport::new(paged_listing).into_arc();
    let ctx = paged_context(transport.clone());
    let query = ThreadQuery {
        limit: Some(3),
        ..ThreadQuery::default()
    };

    let page = fetch_active_threads(&ctx, &query).await.unwrap();

    let ids: Vec<_> = page.threads.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(offsets(&transport), vec!["0", "2"]);
}

#[tokio::test]
async fn test_listing_passes_time_window() {
    let transport = MockTransport::new(paged_listing).into_arc();
    let ctx = paged_context(transport.clone());
    let query = ThreadQuery {
        from: Some(100),
        to: Some(200),
        limit: Some(1),
    };

    fetch_active_threads(&ctx, &query).await.unwrap();

    let calls = transport.calls();
    let first = &calls[0];
    assert_eq!(first.query_value("from_updated_time"), Some("100"));
    assert_eq!(first.query_value("to_updated_time"), Some("200"));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_request_waits_then_succeeds() {
    let attempts = AtomicU32::new(0);
    let transport = MockTransport::new(move |request: &ApiRequest| {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            rate_limited()
        } else {
            fixture(request)
        }
    })
    .into_arc();
    let ctx = FetchContext::new(transport.clone());
    let start = tokio::time::Instant::now();

    let user_id = fetch_my_user_id(&ctx).await.unwrap();

    assert_eq!(user_id, SELF_ID);
    assert!(start.elapsed() >= std::time::Duration::from_secs(5));
    assert_eq!(transport.calls().len(), 2);
    assert!(!ctx.rate_limits.latest().is_rate_limited);
}

#[tokio::test(start_paused = true)]
async fn test_user_id_cached_until_invalidated() {
    let transport = MockTransport::new(fixture).into_arc();
    let ctx = FetchContext::new(transport.clone());

    assert_eq!(fetch_my_user_id(&ctx).await.unwrap(), SELF_ID);
    assert_eq!(fetch_my_user_id(&ctx).await.unwrap(), SELF_ID);
    assert_eq!(transport.calls().len(), 1);

    ctx.identity.invalidate();
    fetch_my_user_id(&ctx).await.unwrap();
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_client_info_missing_project() {
    let transport = MockTransport::new(|request: &ApiRequest| {
        if request.path == "/projects/0.1/projects/" {
            ok(json!({"projects": []}))
        } else {
            fixture(request)
        }
    })
    .into_arc();
    let ctx = FetchContext::new(transport.clone());

    let err = fetch_client_info(&ctx, 100).await.unwrap_err();

    assert!(matches!(err, FetchError::ProjectNotFound { project_id: 100, .. }));
    assert!(err.to_string().starts_with("Project not found."));
    assert!(transport.calls_to("/users/0.1/users/55/").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_client_info_joins_project_owner_and_thread() {
    let ctx = FetchContext::new(MockTransport::new(fixture).into_arc());

    let info = fetch_client_info(&ctx, 100).await.unwrap();

    assert_eq!(info.project.title.as_deref(), Some("Scraper"));
    assert_eq!(info.client.username.as_deref(), Some("acme"));
    assert_eq!(info.thread.map(|t| t.id), Some(10));
}

#[tokio::test]
async fn test_send_message_posts_once() {
    let transport =
        MockTransport::new(|_: &ApiRequest| http_error(503, "unavailable")).into_arc();
    let ctx = FetchContext::new(transport.clone());

    let err = send_message(&ctx, 9, "hello").await.unwrap_err();

    assert!(matches!(err, FetchError::CannotSendMessage(_)));
    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].path, "/messages/0.1/threads/9/messages/");
    assert_eq!(
        calls[0].form,
        vec![("message".to_string(), "hello".to_string())]
    );
}

#[tokio::test]
async fn test_send_message_returns_message() {
    let transport = MockTransport::new(|_: &ApiRequest| {
        ok(json!({"id": 31, "thread_id": 9, "message": "hello", "time_created": 50}))
    })
    .into_arc();
    let ctx = FetchContext::new(transport);

    let message = send_message(&ctx, 9, "hello").await.unwrap();
    assert_eq!(message.id, Some(31));
    assert_eq!(message.time_created, Some(50));
}

#[tokio::test]
async fn test_create_thread_form() {
    let transport = MockTransport::new(|_: &ApiRequest| {
        ok(json!({"id": 77, "context": {"type": "project", "id": 100}}))
    })
    .into_arc();
    let ctx = FetchContext::new(transport.clone());

    let thread = create_thread(&ctx, 100, &[55, 999], "hi").await.unwrap();

    assert_eq!(thread.id, 77);
    assert_eq!(thread.project_id(), Some(100));
    let calls = transport.calls();
    let form = &calls[0].form;
    let members: Vec<_> = form
        .iter()
        .filter(|(k, _)| k == "members[]")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(members, vec!["55", "999"]);
    assert!(form.contains(&("context_type".to_string(), "project".to_string())));
    assert!(form.contains(&("context".to_string(), "100".to_string())));
    assert!(form.contains(&("message".to_string(), "hi".to_string())));
}

#[tokio::test]
async fn test_create_thread_without_id_fails() {
    let transport = MockTransport::new(|_: &ApiRequest| ok(json!({}))).into_arc();
    let ctx = FetchContext::new(transport.clone());

    let err = create_thread(&ctx, 100, &[55], "hi").await.unwrap_err();
    assert!(matches!(err, FetchError::CannotCreateThread(_)));
    assert_eq!(transport.calls().len(), 1);
}

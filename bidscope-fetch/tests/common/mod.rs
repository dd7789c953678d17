//! In-memory transport and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bidscope_core::RateLimitSnapshot;
use bidscope_fetch::client::error_from_body;
use bidscope_fetch::{ApiError, ApiRequest, ApiResponse, ApiTransport};
use serde_json::{Value, json};

type Handler = dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync;
type Delay = dyn Fn(&ApiRequest) -> Duration + Send + Sync;

/// Transport that answers from a closure and records every request.
pub struct MockTransport {
    handler: Box<Handler>,
    delay: Option<Box<Delay>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(
        mut self,
        delay: impl Fn(&ApiRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn request(&self, request: &ApiRequest) -> ApiResponse {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }
        (self.handler)(request)
    }
}

/// Wraps `result` in the platform's success envelope.
pub fn ok(result: Value) -> ApiResponse {
    let mut response = ApiResponse::ok(json!({"status": "success", "result": result}));
    response.rate_limits = RateLimitSnapshot {
        limit: "100".to_string(),
        remaining: "99".to_string(),
        is_rate_limited: false,
    };
    response
}

/// A non-2xx JSON error response.
pub fn http_error(status: u16, message: &str) -> ApiResponse {
    let body = json!({"status": "error", "message": message}).to_string();
    ApiResponse::failed(error_from_body(status, Some("application/json"), &body))
}

/// An HTTP 429 response.
pub fn rate_limited() -> ApiResponse {
    ApiResponse::failed(ApiError::rate_limited())
}

/// Id from a query parameter such as `projects[]`.
pub fn query_id(request: &ApiRequest, key: &str) -> Option<u64> {
    request.query_value(key).and_then(|v| v.parse().ok())
}

// ============================================================================
// Fixture account
// ============================================================================

pub const SELF_ID: u64 = 999;

/// Four listed threads: project 100 (fully populated), a support chat,
/// project 200 (owner missing), and project 300 (lost bid).
pub fn fixture(request: &ApiRequest) -> ApiResponse {
    let path = request.path.as_str();
    match path {
        "/users/0.1/self/" => ok(json!({"id": SELF_ID, "username": "me"})),
        "/messages/0.1/threads/" if request.query_value("folders[]").is_some() => ok(json!({
            "threads": [
                {"id": 7, "thread": {"context": {"type": "project", "id": 100}, "time_created": 1200}},
                {"id": 8, "context": {"type": "support_chat", "id": 1}},
                {"id": 9, "context": {"type": "project", "id": 200}, "time_created": 3000},
                {"id": 10, "context": {"type": "project", "id": 300}, "time_created": 4000}
            ]
        })),
        "/messages/0.1/threads/" => {
            let project_id = request
                .query_value("context")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_default();
            ok(json!({"threads": [{"id": project_id / 10, "context": {"type": "project", "id": project_id}}]}))
        }
        "/projects/0.1/projects/" => match query_id(request, "projects[]") {
            Some(100) => ok(json!({"projects": [{
                "id": 100, "owner_id": 55, "title": "Scraper", "type": "fixed",
                "submitdate": 400, "bid_stats": {"bid_count": 3, "bid_avg": 120}
            }]})),
            Some(200) => ok(json!({"projects": [{"id": 200, "owner_id": 404, "title": "Secret"}]})),
            Some(300) => ok(json!({"projects": {"300": {"id": 300, "owner_id": 66, "type": "hourly"}}})),
            _ => ok(json!({"projects": []})),
        },
        "/users/0.1/users/55/" => ok(json!({"id": 55, "username": "acme"})),
        "/users/0.1/users/66/" => ok(json!({"id": 66, "username": "globex"})),
        p if p.starts_with("/users/0.1/users/") => http_error(404, "User not found"),
        "/projects/0.1/bids/" => match query_id(request, "projects[]") {
            Some(100) => ok(json!({"bids": [{
                "id": 1, "project_id": 100, "bidder_id": SELF_ID, "amount": 150,
                "time_submitted": 1000, "award_status": "awarded", "time_awarded": 1500
            }]})),
            Some(300) => ok(json!({"bids": [{
                "id": 3, "project_id": 300, "amount": "40", "time_submitted": 3500,
                "award_status": "rejected"
            }]})),
            _ => ok(json!({"bids": []})),
        },
        "/projects/0.1/milestones/" => match query_id(request, "projects[]") {
            Some(100) => ok(json!({"milestones": {
                "11": {"bid_id": 1, "status": "cleared", "amount": "10.5"},
                "12": {"bid_id": 1, "status": "released", "amount": "bad"},
                "13": {"bid_id": 1, "status": "pending", "amount": 5}
            }})),
            _ => ok(json!({"milestones": []})),
        },
        "/messages/0.1/messages/" => match query_id(request, "threads[]") {
            Some(7) => ok(json!({"messages": [{"id": 70, "thread_id": 7, "time_created": 1600}]})),
            _ => ok(json!({"messages": []})),
        },
        _ => http_error(404, "unknown path"),
    }
}

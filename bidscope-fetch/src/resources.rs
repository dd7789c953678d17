//! Resource fetchers for the platform API.
//!
//! Each fetcher is a narrow async function over a [`FetchContext`] that
//! returns unwrapped domain data. GET requests go through the retry policy,
//! then the limiter, then the transport; POST requests skip the retry
//! policy so that a message is never delivered twice.
//!
//! Lookups that legitimately find nothing return `None` or an empty value;
//! only transport and upstream failures are errors.

use bidscope_core::lenient::{normalize_collection, parse_id};
use bidscope_core::{Bid, Message, PaidMilestones, Project, RateLimitSnapshot, Thread, User};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::client::ApiRequest;
use crate::context::FetchContext;
use crate::error::FetchError;

/// Thread listing and creation.
pub const THREADS_PATH: &str = "/messages/0.1/threads/";
/// Message listing.
pub const MESSAGES_PATH: &str = "/messages/0.1/messages/";
/// Project lookup.
pub const PROJECTS_PATH: &str = "/projects/0.1/projects/";
/// Bid lookup.
pub const BIDS_PATH: &str = "/projects/0.1/bids/";
/// Milestone lookup.
pub const MILESTONES_PATH: &str = "/projects/0.1/milestones/";
/// Authenticated user.
pub const SELF_PATH: &str = "/users/0.1/self/";

/// Upper bound on listing pages, in case the upstream never returns a
/// short page.
const MAX_PAGES: u32 = 1_000;

fn user_path(user_id: u64) -> String {
    format!("/users/0.1/users/{user_id}/")
}

fn thread_messages_path(thread_id: u64) -> String {
    format!("/messages/0.1/threads/{thread_id}/messages/")
}

// ============================================================================
// Request Plumbing
// ============================================================================

/// Sends a GET through retry, limiter and transport.
async fn send(ctx: &FetchContext, request: &ApiRequest) -> Result<Value, FetchError> {
    let value = ctx
        .retry
        .run(move || async move { send_once_raw(ctx, request).await })
        .await?;
    Ok(unwrap_result(value))
}

/// Sends a request exactly once through the limiter.
async fn send_once(ctx: &FetchContext, request: &ApiRequest) -> Result<Value, FetchError> {
    send_once_raw(ctx, request).await.map(unwrap_result)
}

async fn send_once_raw(ctx: &FetchContext, request: &ApiRequest) -> Result<Value, FetchError> {
    let response = ctx.limiter.execute(ctx.transport.request(request)).await;
    ctx.rate_limits.record(&response.rate_limits);
    Ok(response.into_result()?)
}

/// Strips the `{"status": ..., "result": ...}` envelope.
fn unwrap_result(mut value: Value) -> Value {
    match value.get_mut("result") {
        Some(result) => result.take(),
        None => value,
    }
}

/// Decodes a collection, skipping items that fail to decode.
fn decode_items<T: DeserializeOwned>(items: Vec<&Value>, kind: &'static str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(kind, error = %e, "Skipping malformed item");
                None
            }
        })
        .collect()
}

fn decode_field<T: DeserializeOwned>(result: &Value, field: &'static str) -> Vec<T> {
    decode_items(normalize_collection(result.get(field)), field)
}

// ============================================================================
// Threads
// ============================================================================

/// Filters for the active-thread listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadQuery {
    /// Only threads updated at or after this time (epoch seconds).
    pub from: Option<i64>,
    /// Only threads updated at or before this time (epoch seconds).
    pub to: Option<i64>,
    /// Maximum number of project threads to return.
    pub limit: Option<usize>,
}

/// Project threads and the rate-limit state after listing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThreadsPage {
    /// Project threads, in listing order.
    pub threads: Vec<Thread>,
    /// Latest rate-limit snapshot.
    pub rate_limits: RateLimitSnapshot,
}

/// Lists active project threads, paging until a short page.
///
/// Non-project threads are dropped; `limit` counts project threads only.
#[instrument(skip(ctx))]
pub async fn fetch_active_threads(
    ctx: &FetchContext,
    query: &ThreadQuery,
) -> Result<ThreadsPage, FetchError> {
    let page_size = ctx.settings.thread_page_size.max(1);
    let mut threads = Vec::new();
    let mut offset: usize = 0;

    for page in 0..MAX_PAGES {
        if query.limit.is_some_and(|limit| threads.len() >= limit) {
            break;
        }

        let mut request = ApiRequest::get(THREADS_PATH)
            .query("folders[]", "active")
            .query("limit", page_size)
            .query("offset", offset);
        if let Some(from) = query.from {
            request = request.query("from_updated_time", from);
        }
        if let Some(to) = query.to {
            request = request.query("to_updated_time", to);
        }

        let result = send(ctx, &request).await?;
        let raw = normalize_collection(result.get("threads"));
        let raw_count = raw.len();
        let decoded: Vec<Thread> = decode_items(raw, "threads");
        let before = threads.len();
        threads.extend(decoded.into_iter().filter(Thread::is_project));

        debug!(
            page,
            offset,
            received = raw_count,
            kept = threads.len() - before,
            "Thread page"
        );

        if raw_count < page_size as usize {
            break;
        }
        offset += raw_count;
    }

    if let Some(limit) = query.limit {
        threads.truncate(limit);
    }

    Ok(ThreadsPage {
        threads,
        rate_limits: ctx.rate_limits.latest(),
    })
}

/// Finds the thread attached to a project. Failures are logged and
/// reported as `None`.
#[instrument(skip(ctx))]
pub async fn fetch_thread_for_project(ctx: &FetchContext, project_id: u64) -> Option<Thread> {
    let request = ApiRequest::get(THREADS_PATH)
        .query("context_type", "project")
        .query("context", project_id);

    match send(ctx, &request).await {
        Ok(result) => decode_field::<Thread>(&result, "threads")
            .into_iter()
            .find(|t| t.project_id() == Some(project_id)),
        Err(e) => {
            warn!(project_id, error = %e, "Thread lookup failed");
            None
        }
    }
}

/// Time of the earliest message in a thread, or `None` if it has none.
#[instrument(skip(ctx))]
pub async fn fetch_first_message_date(
    ctx: &FetchContext,
    thread_id: u64,
) -> Result<Option<i64>, FetchError> {
    let request = ApiRequest::get(MESSAGES_PATH)
        .query("threads[]", thread_id)
        .query("limit", 1)
        .query("offset", 0)
        .query("sort_field", "time_created")
        .query("sort_direction", "asc");

    let result = send(ctx, &request).await?;
    let messages: Vec<Message> = decode_field(&result, "messages");
    Ok(messages.iter().filter_map(|m| m.time_created).min())
}

// ============================================================================
// Projects and Clients
// ============================================================================

/// Looks up one project.
#[instrument(skip(ctx))]
pub async fn fetch_project(
    ctx: &FetchContext,
    project_id: u64,
) -> Result<Option<Project>, FetchError> {
    let request = ApiRequest::get(PROJECTS_PATH)
        .query("projects[]", project_id)
        .query("job_details", "true");

    let result = send(ctx, &request).await?;
    let mut projects: Vec<Project> = decode_field(&result, "projects");
    let index = projects
        .iter()
        .position(|p| p.id == Some(project_id))
        .unwrap_or(0);
    Ok((index < projects.len()).then(|| projects.swap_remove(index)))
}

/// Looks up one user.
#[instrument(skip(ctx))]
pub async fn fetch_user(ctx: &FetchContext, user_id: u64) -> Result<Option<User>, FetchError> {
    let request = ApiRequest::get(user_path(user_id))
        .query("employer_reputation", "true")
        .query("status", "true")
        .query("badge_details", "true");

    let result = send(ctx, &request).await?;
    if !result.is_object() {
        return Ok(None);
    }
    let user = User::deserialize(&result)?;
    Ok(user.id.is_some().then_some(user))
}

/// A project together with its owner and thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientInfo {
    /// The project.
    pub project: Project,
    /// The project owner.
    pub client: User,
    /// The project's thread, if one was found.
    pub thread: Option<Thread>,
}

/// Project, then owner, then thread, in that order.
///
/// Fails with [`FetchError::ProjectNotFound`] or
/// [`FetchError::ClientNotFound`] when either lookup fails or finds nothing.
#[instrument(skip(ctx))]
pub async fn fetch_client_info(
    ctx: &FetchContext,
    project_id: u64,
) -> Result<ClientInfo, FetchError> {
    let project = fetch_project(ctx, project_id)
        .await
        .map_err(|e| FetchError::ProjectNotFound {
            project_id,
            reason: e.to_string(),
        })?
        .ok_or_else(|| FetchError::ProjectNotFound {
            project_id,
            reason: "no project in response".to_string(),
        })?;

    let owner_id = project.owner_id.ok_or_else(|| FetchError::ClientNotFound {
        user_id: None,
        reason: "project has no owner".to_string(),
    })?;

    let client = fetch_user(ctx, owner_id)
        .await
        .map_err(|e| FetchError::ClientNotFound {
            user_id: Some(owner_id),
            reason: e.to_string(),
        })?
        .ok_or_else(|| FetchError::ClientNotFound {
            user_id: Some(owner_id),
            reason: "no user in response".to_string(),
        })?;

    let thread = fetch_thread_for_project(ctx, project_id).await;

    Ok(ClientInfo {
        project,
        client,
        thread,
    })
}

// ============================================================================
// Bids and Milestones
// ============================================================================

/// The user's bid on a project, if any.
#[instrument(skip(ctx))]
pub async fn fetch_my_bid_for_project(
    ctx: &FetchContext,
    project_id: u64,
    user_id: u64,
) -> Result<Option<Bid>, FetchError> {
    let request = ApiRequest::get(BIDS_PATH)
        .query("projects[]", project_id)
        .query("bidders[]", user_id);

    let result = send(ctx, &request).await?;
    let bids: Vec<Bid> = decode_field(&result, "bids");
    Ok(bids.into_iter().next())
}

/// The user's cleared and released milestones on a project.
#[instrument(skip(ctx))]
pub async fn fetch_paid_milestones_for_project(
    ctx: &FetchContext,
    project_id: u64,
    user_id: u64,
) -> Result<PaidMilestones, FetchError> {
    let request = ApiRequest::get(MILESTONES_PATH)
        .query("projects[]", project_id)
        .query("bidders[]", user_id);

    let result = send(ctx, &request).await?;
    Ok(PaidMilestones::from_milestones(decode_field(
        &result,
        "milestones",
    )))
}

// ============================================================================
// Identity
// ============================================================================

/// Id of the authenticated user, cached on the context after the first
/// success.
#[instrument(skip(ctx))]
pub async fn fetch_my_user_id(ctx: &FetchContext) -> Result<u64, FetchError> {
    if let Some(user_id) = ctx.identity.get() {
        return Ok(user_id);
    }

    let result = send(ctx, &ApiRequest::get(SELF_PATH)).await?;
    let user_id = result
        .get("id")
        .and_then(parse_id)
        .ok_or_else(|| FetchError::InvalidResponse("self lookup returned no id".to_string()))?;

    ctx.identity.set(user_id);
    debug!(user_id, "Resolved current user");
    Ok(user_id)
}

// ============================================================================
// Messaging
// ============================================================================

/// Opens a project thread with `member_ids` and a first message.
#[instrument(skip(ctx, message))]
pub async fn create_thread(
    ctx: &FetchContext,
    project_id: u64,
    member_ids: &[u64],
    message: &str,
) -> Result<Thread, FetchError> {
    let mut request = ApiRequest::post(THREADS_PATH);
    for member in member_ids {
        request = request.form("members[]", member);
    }
    let request = request
        .form("context_type", "project")
        .form("context", project_id)
        .form("message", message);

    let result = send_once(ctx, &request)
        .await
        .map_err(|e| FetchError::CannotCreateThread(e.to_string()))?;
    let thread = Thread::deserialize(&result)?;
    if thread.id == 0 {
        return Err(FetchError::CannotCreateThread(
            "response did not include a thread id".to_string(),
        ));
    }
    Ok(thread)
}

/// Posts a message to an existing thread.
#[instrument(skip(ctx, message))]
pub async fn send_message(
    ctx: &FetchContext,
    thread_id: u64,
    message: &str,
) -> Result<Message, FetchError> {
    let request = ApiRequest::post(thread_messages_path(thread_id)).form("message", message);

    let result = send_once(ctx, &request)
        .await
        .map_err(|e| FetchError::CannotSendMessage(e.to_string()))?;
    Ok(Message::deserialize(&result).unwrap_or_default())
}

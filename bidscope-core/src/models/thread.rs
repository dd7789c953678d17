//! Messaging thread and message types.

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Context type of threads attached to a project.
pub const PROJECT_CONTEXT: &str = "project";

// ============================================================================
// Thread
// ============================================================================

/// What a thread is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadContext {
    /// Identifier of the context object (the project id for project threads).
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<u64>,
    /// Context type, e.g. `project` or `support_chat`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ThreadContext {
    /// Creates a project context.
    pub fn project(project_id: u64) -> Self {
        Self {
            id: Some(project_id),
            kind: PROJECT_CONTEXT.to_string(),
        }
    }
}

/// A conversation on the platform.
///
/// The listing endpoint nests most fields under a `thread` key while other
/// endpoints return them flat; both shapes decode into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ThreadWire")]
pub struct Thread {
    /// Thread id.
    pub id: u64,
    /// User who opened the thread.
    pub owner_id: Option<u64>,
    /// What the thread is attached to.
    pub context: ThreadContext,
    /// Creation time (epoch seconds).
    pub time_created: Option<i64>,
}

impl Thread {
    /// Creates a project thread.
    pub fn for_project(id: u64, project_id: u64) -> Self {
        Self {
            id,
            owner_id: None,
            context: ThreadContext::project(project_id),
            time_created: None,
        }
    }

    /// Returns true if the thread is attached to a project.
    pub fn is_project(&self) -> bool {
        self.context.kind == PROJECT_CONTEXT
    }

    /// Returns the project id for project threads.
    pub fn project_id(&self) -> Option<u64> {
        if self.is_project() { self.context.id } else { None }
    }
}

#[derive(Deserialize)]
struct ThreadWire {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    id: Option<u64>,
    #[serde(default, deserialize_with = "lenient::or_none")]
    thread: Option<ThreadBody>,
    #[serde(default, deserialize_with = "lenient::or_none")]
    context: Option<ThreadContext>,
    #[serde(default, alias = "owner", deserialize_with = "lenient::opt_id")]
    owner_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    time_created: Option<i64>,
}

#[derive(Default, Deserialize)]
struct ThreadBody {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    id: Option<u64>,
    #[serde(default, deserialize_with = "lenient::or_none")]
    context: Option<ThreadContext>,
    #[serde(default, alias = "owner_id", deserialize_with = "lenient::opt_id")]
    owner: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    time_created: Option<i64>,
}

impl From<ThreadWire> for Thread {
    fn from(wire: ThreadWire) -> Self {
        let body = wire.thread.unwrap_or_default();

        Self {
            id: wire.id.or(body.id).unwrap_or_default(),
            owner_id: wire.owner_id.or(body.owner),
            context: wire.context.or(body.context).unwrap_or_default(),
            time_created: wire.time_created.or(body.time_created),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A single message inside a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message id.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<u64>,
    /// Thread the message belongs to.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub thread_id: Option<u64>,
    /// Sender.
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub from_user: Option<u64>,
    /// Message body.
    #[serde(default)]
    pub message: Option<String>,
    /// Send time (epoch seconds).
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub time_created: Option<i64>,
}

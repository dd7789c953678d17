//! Pure join of bulk collections into rows.
//!
//! [`transform_to_rows`] is the offline counterpart of the enrichment
//! pipeline: given everything already fetched, it produces one
//! [`EnrichedRecord`] per bid without touching the network.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::lenient;
use crate::models::{Bid, EnrichedRecord, Milestone, Project, RecordBuilder, Thread, User};

/// Bulk collections as fetched from the platform.
///
/// Each collection may be encoded as an array or as an object keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkCollections {
    /// Bids, one row each.
    #[serde(deserialize_with = "collection")]
    pub bids: Vec<Bid>,
    /// Projects referenced by the bids.
    #[serde(deserialize_with = "collection")]
    pub projects: Vec<Project>,
    /// Project owners.
    #[serde(deserialize_with = "collection")]
    pub users: Vec<User>,
    /// Threads, matched to bids through their project context.
    #[serde(deserialize_with = "collection")]
    pub threads: Vec<Thread>,
    /// Milestones, matched to bids by bid id.
    #[serde(deserialize_with = "collection")]
    pub milestones: Vec<Milestone>,
}

/// Decodes an array-or-object collection, dropping items that fail to decode.
fn collection<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(lenient::normalize_collection(value.as_ref())
        .into_iter()
        .filter_map(|item| T::deserialize(item).ok())
        .collect())
}

/// Lookup tables built once per transform.
struct Indexes<'a> {
    projects_by_id: HashMap<u64, &'a Project>,
    users_by_id: HashMap<u64, &'a User>,
    threads_by_project_id: HashMap<u64, &'a Thread>,
    milestones_by_bid_id: HashMap<u64, Vec<&'a Milestone>>,
}

impl<'a> Indexes<'a> {
    fn build(data: &'a BulkCollections) -> Self {
        let projects_by_id = data
            .projects
            .iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect();

        let users_by_id = data
            .users
            .iter()
            .filter_map(|u| u.id.map(|id| (id, u)))
            .collect();

        let mut threads_by_project_id = HashMap::new();
        for thread in &data.threads {
            if let Some(project_id) = thread.project_id() {
                threads_by_project_id.entry(project_id).or_insert(thread);
            }
        }

        let mut milestones_by_bid_id: HashMap<u64, Vec<&Milestone>> = HashMap::new();
        for milestone in &data.milestones {
            if let Some(bid_id) = milestone.bid_id {
                milestones_by_bid_id.entry(bid_id).or_default().push(milestone);
            }
        }

        Self {
            projects_by_id,
            users_by_id,
            threads_by_project_id,
            milestones_by_bid_id,
        }
    }
}

/// Joins bids with their project, client, thread and milestones.
///
/// Total over its input: every bid yields exactly one row, in input order,
/// and anything that cannot be matched resolves to sentinels. Calling it
/// twice on the same input yields equal output.
pub fn transform_to_rows(data: &BulkCollections) -> Vec<EnrichedRecord> {
    let indexes = Indexes::build(data);

    data.bids
        .iter()
        .map(|bid| {
            let project = bid
                .project_id
                .and_then(|id| indexes.projects_by_id.get(&id).copied());
            let client_id = bid.project_owner_id.or(project.and_then(|p| p.owner_id));
            let client = client_id.and_then(|id| indexes.users_by_id.get(&id).copied());
            let thread = bid
                .project_id
                .and_then(|id| indexes.threads_by_project_id.get(&id).copied());
            let milestones = bid
                .id
                .and_then(|id| indexes.milestones_by_bid_id.get(&id))
                .map(Vec::as_slice)
                .unwrap_or_default();

            RecordBuilder::new()
                .thread(thread)
                .project(project)
                .client(client)
                .bid(Some(bid))
                .milestones(milestones.iter().copied())
                .build()
        })
        .collect()
}

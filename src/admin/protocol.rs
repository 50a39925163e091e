//! Admin Wire Protocol
//!
//! Endpoints and DTOs of the `VideoContentAdmin` service: cluster membership
//! changes and introspection. This is a pure control plane, so requests and
//! responses are JSON.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Add a storage node to the ring and migrate its share of the keyspace in.
pub const ENDPOINT_ADD_NODE: &str = "/admin/add_node";
/// Drain a storage node and remove it from the ring.
pub const ENDPOINT_REMOVE_NODE: &str = "/admin/remove_node";
/// Current membership in ring order.
pub const ENDPOINT_LIST_NODES: &str = "/admin/list_nodes";
/// Controller and host statistics.
pub const ENDPOINT_STATS: &str = "/admin/health";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct AddNodeRequest {
    pub node_address: String,
}

/// Outcome of an AddNode. On failure the count reports the entries the donor
/// was asked to move alongside the error, so a partial migration is visible
/// to the operator.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddNodeResponse {
    pub migrated_file_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveNodeRequest {
    pub node_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveNodeResponse {
    pub migrated_file_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Membership in ascending node-id order; a client can reproduce routing
/// decisions locally from this list.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListNodesResponse {
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingEntry {
    pub node_id: u64,
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStatsResponse {
    pub node_count: usize,
    pub ring: Vec<RingEntry>,
    pub managed_nodes: Vec<String>,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

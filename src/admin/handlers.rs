//! Admin API Handlers
//!
//! HTTP endpoints exposing the [`AdminController`] to operators. These
//! translate JSON requests into controller calls and report migration
//! outcomes, including the partial ones.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::{get, post};
use sysinfo::System;

use crate::admin::controller::AdminController;
use crate::admin::protocol::*;

/// Builds the `VideoContentAdmin` router.
pub fn router(controller: Arc<AdminController>) -> Router {
    Router::new()
        .route(ENDPOINT_ADD_NODE, post(handle_add_node))
        .route(ENDPOINT_REMOVE_NODE, post(handle_remove_node))
        .route(ENDPOINT_LIST_NODES, get(handle_list_nodes))
        .route(ENDPOINT_STATS, get(handle_stats))
        .layer(Extension(controller))
}

pub async fn handle_add_node(
    Extension(controller): Extension<Arc<AdminController>>,
    Json(req): Json<AddNodeRequest>,
) -> (StatusCode, Json<AddNodeResponse>) {
    match controller.add_node(&req.node_address).await {
        Ok(count) => (
            StatusCode::OK,
            Json(AddNodeResponse {
                migrated_file_count: count,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("add_node {} failed: {}", req.node_address, e);
            (
                e.error.status(),
                Json(AddNodeResponse {
                    migrated_file_count: e.migrated,
                    error: Some(e.error.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_remove_node(
    Extension(controller): Extension<Arc<AdminController>>,
    Json(req): Json<RemoveNodeRequest>,
) -> (StatusCode, Json<RemoveNodeResponse>) {
    match controller.remove_node(&req.node_address).await {
        Ok(count) => (
            StatusCode::OK,
            Json(RemoveNodeResponse {
                migrated_file_count: count,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("remove_node {} failed: {}", req.node_address, e);
            (
                e.error.status(),
                Json(RemoveNodeResponse {
                    migrated_file_count: e.migrated,
                    error: Some(e.error.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_list_nodes(
    Extension(controller): Extension<Arc<AdminController>>,
) -> Json<ListNodesResponse> {
    Json(ListNodesResponse {
        nodes: controller.list_nodes().await,
    })
}

pub async fn handle_stats(
    Extension(controller): Extension<Arc<AdminController>>,
) -> Json<AdminStatsResponse> {
    let ring: Vec<RingEntry> = controller
        .ring_entries()
        .await
        .into_iter()
        .map(|(node_id, address)| RingEntry { node_id, address })
        .collect();

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(AdminStatsResponse {
        node_count: ring.len(),
        ring,
        managed_nodes: controller.managed_addresses(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}

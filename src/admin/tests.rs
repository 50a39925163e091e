use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;

use crate::admin::controller::AdminController;
use crate::admin::handlers;
use crate::admin::protocol::{
    AddNodeRequest, AddNodeResponse, ENDPOINT_ADD_NODE, ENDPOINT_LIST_NODES, ListNodesResponse,
};
use crate::content::router::ContentRouter;
use crate::error::ContentError;
use crate::ring::hashring::{fingerprint, node_id};
use crate::storage::client::StorageClient;
use crate::storage::protocol::{FileEntry, storage_key};
use crate::storage::service::{StorageNode, run_storage_node};
use crate::storage::store::BlobStore;

/// Starts a real storage node on an ephemeral port and returns its address.
async fn start_node(dir: &Path) -> String {
    let store = BlobStore::open(dir).unwrap();
    let node = Arc::new(StorageNode::new(store));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = run_storage_node(listener, node).await;
    });
    addr
}

/// Picks a free port for a node the controller will start itself.
async fn reserve_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

fn entry(video_id: &str, filename: &str, data: &[u8]) -> FileEntry {
    FileEntry {
        video_id: video_id.to_string(),
        filename: filename.to_string(),
        data: data.to_vec(),
    }
}

// ============================================================
// PEER TRANSFER
// ============================================================

#[tokio::test]
async fn test_send_files_moves_entries_to_the_peer() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let addr_a = start_node(dir_a.path()).await;
    let addr_b = start_node(dir_b.path()).await;

    let client_a = StorageClient::new(&addr_a);
    let entries = vec![
        entry("cat", "manifest.mpd", b"mpd"),
        entry("cat", "init.m4s", b"init"),
        entry("dog", "seg-0001.m4s", b"woof"),
    ];
    client_a.write_files(entries.clone()).await.unwrap();

    let transferred = client_a.send_files(&addr_b, entries.clone()).await.unwrap();
    assert_eq!(transferred, 3);

    // Everything is readable on the peer and gone from the sender.
    let client_b = StorageClient::new(&addr_b);
    for wanted in &entries {
        assert_eq!(
            client_b.read_file(&wanted.video_id, &wanted.filename).await.unwrap(),
            wanted.data
        );
    }
    let remaining = client_a.list_files().await.unwrap().keys;
    assert!(remaining.is_empty(), "sender still holds {remaining:?}");
}

#[tokio::test]
async fn test_send_file_moves_a_single_entry() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let addr_a = start_node(dir_a.path()).await;
    let addr_b = start_node(dir_b.path()).await;

    let client_a = StorageClient::new(&addr_a);
    client_a
        .write_file("cat", "init.m4s", b"init".to_vec())
        .await
        .unwrap();

    client_a
        .send_file(&addr_b, "cat", "init.m4s", b"init".to_vec())
        .await
        .unwrap();

    let client_b = StorageClient::new(&addr_b);
    assert_eq!(client_b.read_file("cat", "init.m4s").await.unwrap(), b"init");
    let err = client_a.read_file("cat", "init.m4s").await.unwrap_err();
    assert!(matches!(err, ContentError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_send_files_keeps_entries_on_the_sender() {
    let dir_a = TempDir::new().unwrap();
    let addr_a = start_node(dir_a.path()).await;

    let client_a = StorageClient::new(&addr_a);
    let entries = vec![entry("cat", "init.m4s", b"init"), entry("cat", "a.m4s", b"a")];
    client_a.write_files(entries.clone()).await.unwrap();

    // Port 1 refuses connections, so the peer write never happens.
    let err = client_a.send_files("127.0.0.1:1", entries.clone()).await.unwrap_err();
    assert!(matches!(err, ContentError::Transport(_)));

    for wanted in &entries {
        assert_eq!(
            client_a.read_file(&wanted.video_id, &wanted.filename).await.unwrap(),
            wanted.data
        );
    }
}

#[tokio::test]
async fn test_shutdown_rpc_stops_the_server_after_the_response() {
    let dir = TempDir::new().unwrap();
    let addr = start_node(dir.path()).await;

    let client = StorageClient::new(&addr);
    client.shutdown().await.unwrap();

    // The server lingers briefly so the response can flush, then stops.
    tokio::time::sleep(Duration::from_millis(800)).await;
    let probe = StorageClient::new(&addr).with_timeout(Duration::from_secs(2));
    let err = probe.list_files().await.unwrap_err();
    assert!(matches!(err, ContentError::Transport(_)));
}

// ============================================================
// ADD NODE
// ============================================================

#[tokio::test]
async fn test_first_add_node_has_nothing_to_migrate() {
    let base = TempDir::new().unwrap();
    let controller = AdminController::new(base.path());

    let addr = reserve_addr().await;
    let migrated = controller.add_node(&addr).await.unwrap();
    assert_eq!(migrated, 0);
    assert_eq!(controller.list_nodes().await, vec![addr]);
}

#[tokio::test]
async fn test_add_node_migrates_exactly_the_new_range() {
    let base = TempDir::new().unwrap();
    let controller = AdminController::new(base.path());
    let addr_a = reserve_addr().await;
    controller.add_node(&addr_a).await.unwrap();

    let router = ContentRouter::new(controller.ring());
    for i in 0..100 {
        let filename = format!("f{i:03}");
        router.write("v", &filename, filename.clone().into_bytes()).await.unwrap();
    }

    let addr_b = reserve_addr().await;
    let migrated = controller.add_node(&addr_b).await.unwrap();

    let keys_a = StorageClient::new(&addr_a).list_files().await.unwrap().keys;
    let keys_b = StorageClient::new(&addr_b).list_files().await.unwrap().keys;
    assert_eq!(keys_a.len() + keys_b.len(), 100);
    assert_eq!(migrated, keys_b.len() as u64);

    let on_a: HashSet<String> =
        keys_a.iter().map(|k| storage_key(&k.video_id, &k.filename)).collect();
    let on_b: HashSet<String> =
        keys_b.iter().map(|k| storage_key(&k.video_id, &k.filename)).collect();
    assert!(on_a.is_disjoint(&on_b), "keys duplicated across nodes");

    // Placement matches the ring on both sides.
    {
        let ring = controller.ring();
        let ring = ring.read().await;
        for key in &on_a {
            assert_eq!(ring.owner(fingerprint(key)).unwrap(), addr_a);
        }
        for key in &on_b {
            assert_eq!(ring.owner(fingerprint(key)).unwrap(), addr_b);
        }
    }

    // Every key still resolves through the router.
    for i in 0..100 {
        let filename = format!("f{i:03}");
        assert_eq!(
            router.read("v", &filename).await.unwrap(),
            filename.into_bytes()
        );
    }
}

#[tokio::test]
async fn test_add_of_registered_node_is_rejected() {
    let base = TempDir::new().unwrap();
    let controller = AdminController::new(base.path());
    let addr = reserve_addr().await;
    controller.add_node(&addr).await.unwrap();

    let err = controller.add_node(&addr).await.unwrap_err();
    assert!(matches!(err.error, ContentError::Collision(_)));
    assert_eq!(err.migrated, 0);
}

// ============================================================
// REMOVE NODE
// ============================================================

#[tokio::test]
async fn test_remove_node_drains_everything_to_the_survivor() {
    let base = TempDir::new().unwrap();
    let controller = AdminController::new(base.path());
    let addr_a = reserve_addr().await;
    controller.add_node(&addr_a).await.unwrap();

    let router = ContentRouter::new(controller.ring());
    for i in 0..100 {
        let filename = format!("f{i:03}");
        router.write("v", &filename, filename.clone().into_bytes()).await.unwrap();
    }

    let addr_b = reserve_addr().await;
    controller.add_node(&addr_b).await.unwrap();
    let held_by_b = StorageClient::new(&addr_b).list_files().await.unwrap().keys.len() as u64;

    let drained = controller.remove_node(&addr_b).await.unwrap();
    assert_eq!(drained, held_by_b);

    assert_eq!(controller.list_nodes().await, vec![addr_a.clone()]);
    let keys_a = StorageClient::new(&addr_a).list_files().await.unwrap().keys;
    assert_eq!(keys_a.len(), 100);
    for i in 0..100 {
        let filename = format!("f{i:03}");
        assert_eq!(
            router.read("v", &filename).await.unwrap(),
            filename.into_bytes()
        );
    }

    // The removed node's RPC server is stopped.
    let err = StorageClient::new(&addr_b).list_files().await.unwrap_err();
    assert!(matches!(err, ContentError::Transport(_)));
}

#[tokio::test]
async fn test_remove_of_unknown_node_is_rejected() {
    let base = TempDir::new().unwrap();
    let controller = AdminController::new(base.path());
    let addr = reserve_addr().await;
    controller.add_node(&addr).await.unwrap();

    let err = controller.remove_node("127.0.0.1:9999").await.unwrap_err();
    assert!(matches!(err.error, ContentError::UnknownNode(_)));
}

#[tokio::test]
async fn test_remove_of_last_node_is_rejected() {
    let base = TempDir::new().unwrap();
    let controller = AdminController::new(base.path());
    let addr = reserve_addr().await;
    controller.add_node(&addr).await.unwrap();

    let err = controller.remove_node(&addr).await.unwrap_err();
    assert!(matches!(err.error, ContentError::LastNode(_)));
    assert_eq!(controller.list_nodes().await, vec![addr]);
}

// ============================================================
// MEMBERSHIP LISTING AND ADMIN API
// ============================================================

#[tokio::test]
async fn test_list_nodes_is_in_ascending_id_order() {
    let base = TempDir::new().unwrap();
    let controller = AdminController::new(base.path());
    for _ in 0..3 {
        let addr = reserve_addr().await;
        controller.add_node(&addr).await.unwrap();
    }

    let nodes = controller.list_nodes().await;
    assert_eq!(nodes.len(), 3);
    let ids: Vec<u64> = nodes.iter().map(|a| node_id(a)).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[tokio::test]
async fn test_admin_api_over_http() {
    let base = TempDir::new().unwrap();
    let controller = Arc::new(AdminController::new(base.path()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = listener.local_addr().unwrap().to_string();
    let app = handlers::router(controller);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let node_addr = reserve_addr().await;
    let http = reqwest::Client::new();
    let resp: AddNodeResponse = http
        .post(format!("http://{admin_addr}{ENDPOINT_ADD_NODE}"))
        .json(&AddNodeRequest {
            node_address: node_addr.clone(),
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp.migrated_file_count, 0);
    assert!(resp.error.is_none());

    let listed: ListNodesResponse = http
        .get(format!("http://{admin_addr}{ENDPOINT_LIST_NODES}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.nodes, vec![node_addr]);
}

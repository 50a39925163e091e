use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;

use crate::error::ContentError;
use crate::ring::hashring::{HashRing, fingerprint, node_id};
use crate::storage::client::StorageClient;
use crate::storage::protocol::FileEntry;
use crate::storage::service::{StorageNode, run_storage_node};
use crate::storage::store::BlobStore;

/// An AddNode/RemoveNode failure, carrying how many files the operation had
/// already scheduled or moved when it failed. The ring is never rolled back:
/// forward ownership stays consistent and residual blobs on the wrong node
/// are dead storage until the next migration pass.
#[derive(Debug, Error)]
#[error("{error} (after scheduling {migrated} files)")]
pub struct MigrationError {
    pub migrated: u64,
    #[source]
    pub error: ContentError,
}

impl From<ContentError> for MigrationError {
    fn from(error: ContentError) -> Self {
        Self { migrated: 0, error }
    }
}

/// A storage node this controller started in-process.
struct ManagedNode {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

/// The cluster controller: owns the authoritative hash ring, the registry of
/// locally managed storage nodes, and the migration logic that keeps data
/// placement consistent with the ring across membership changes.
///
/// Admin operations are serialized by an internal lock; data-plane readers
/// share the ring behind its own reader/writer lock and observe either the
/// pre-update or post-update membership, never a torn state.
pub struct AdminController {
    ring: Arc<RwLock<HashRing>>,
    managed: DashMap<String, ManagedNode>,
    ops: Mutex<()>,
    base_dir: PathBuf,
    http: reqwest::Client,
}

impl AdminController {
    /// Controller over an empty ring. `base_dir` hosts the store directories
    /// of nodes this controller starts itself.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            ring: Arc::new(RwLock::new(HashRing::new())),
            managed: DashMap::new(),
            ops: Mutex::new(()),
            base_dir: base_dir.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Controller over a ring seeded with already-running storage daemons.
    pub fn with_initial_nodes<I, S>(
        base_dir: impl Into<PathBuf>,
        addrs: I,
    ) -> Result<Self, ContentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut controller = Self::new(base_dir);
        controller.ring = Arc::new(RwLock::new(HashRing::with_nodes(addrs)?));
        Ok(controller)
    }

    /// The ring shared with content routers.
    pub fn ring(&self) -> Arc<RwLock<HashRing>> {
        self.ring.clone()
    }

    /// Current membership in ring order.
    pub async fn list_nodes(&self) -> Vec<String> {
        self.ring.read().await.nodes()
    }

    /// Addresses of the nodes this controller started in-process.
    pub fn managed_addresses(&self) -> Vec<String> {
        self.managed.iter().map(|e| e.key().clone()).collect()
    }

    /// Ring entries (id, address) in ascending id order.
    pub async fn ring_entries(&self) -> Vec<(u64, String)> {
        self.ring
            .read()
            .await
            .nodes()
            .into_iter()
            .map(|addr| (node_id(&addr), addr))
            .collect()
    }

    /// Adds `addr` to the cluster and migrates its share of the keyspace
    /// from the donor node. Returns the number of files the donor confirmed
    /// transferred.
    ///
    /// The donor is computed explicitly before the ring mutation: while the
    /// new node is absent, the owner of its own id is its ring successor,
    /// which holds every key the new node will take over. From the instant
    /// the ring is updated, reads of not-yet-migrated keys may miss; the
    /// data plane is not frozen during migration.
    pub async fn add_node(&self, addr: &str) -> Result<u64, MigrationError> {
        let _guard = self.ops.lock().await;

        if self.ring.read().await.would_collide(addr) {
            return Err(ContentError::Collision(addr.to_string()).into());
        }

        // 1. Start the new node.
        self.start_local_node(addr).await?;

        // 2. Identify the donor before touching the ring.
        let donor = {
            let ring = self.ring.read().await;
            if ring.is_empty() {
                None
            } else {
                Some(ring.owner(node_id(addr))?.to_string())
            }
        };

        // 3. Update the ring; new writes for the node's range route to it
        //    from here on.
        self.ring.write().await.add(addr)?;
        tracing::info!("node {} joined the ring", addr);

        // 4. Migrate from the donor.
        let Some(donor) = donor else {
            return Ok(0);
        };
        let donor_client = StorageClient::with_client(self.http.clone(), &donor);
        let scan = donor_client.read_files().await?;
        if let Some(scan_err) = scan.error {
            return Err(ContentError::Transport(format!(
                "partial scan of donor {donor}: {scan_err}"
            ))
            .into());
        }

        let to_move = {
            let ring = self.ring.read().await;
            let mut to_move = Vec::new();
            for entry in scan.entries {
                if ring.owner(fingerprint(&entry.key()))? == addr {
                    to_move.push(entry);
                }
            }
            to_move
        };
        let scheduled = to_move.len() as u64;
        if scheduled == 0 {
            tracing::info!("no files to migrate from {}", donor);
            return Ok(0);
        }

        match donor_client.send_files(addr, to_move).await {
            Ok(transferred) => {
                tracing::info!("migrated {} files from {} to {}", transferred, donor, addr);
                Ok(transferred)
            }
            Err(error) => Err(MigrationError {
                migrated: scheduled,
                error,
            }),
        }
    }

    /// Drains `addr` into its ring successor, removes it from the ring, and
    /// stops it. Returns the number of files drained.
    pub async fn remove_node(&self, addr: &str) -> Result<u64, MigrationError> {
        let _guard = self.ops.lock().await;

        // 1. Identify the receiver while the node is still on the ring.
        let receiver = {
            let ring = self.ring.read().await;
            if !ring.contains(addr) {
                return Err(ContentError::UnknownNode(addr.to_string()).into());
            }
            if ring.len() == 1 {
                return Err(ContentError::LastNode(addr.to_string()).into());
            }
            ring.successor(node_id(addr))
                .ok_or(ContentError::EmptyRing)?
                .to_string()
        };

        // 2. Drain everything; the receiver owns the whole range after the
        //    ring update.
        let node_client = StorageClient::with_client(self.http.clone(), addr);
        let scan = node_client.read_files().await?;
        if let Some(scan_err) = scan.error {
            return Err(ContentError::Transport(format!(
                "partial scan of {addr}: {scan_err}"
            ))
            .into());
        }
        let entries: Vec<FileEntry> = scan.entries;
        let count = entries.len() as u64;
        if count > 0 {
            node_client
                .send_files(&receiver, entries)
                .await
                .map_err(|error| MigrationError {
                    migrated: count,
                    error,
                })?;
            tracing::info!("drained {} files from {} to {}", count, addr, receiver);
        }

        // 3. Ring mutation.
        self.ring.write().await.remove(addr)?;
        tracing::info!("node {} left the ring", addr);

        // 4. Stop the node: locally managed servers get a graceful stop,
        //    everything else a remote Shutdown RPC.
        if let Some((_, managed)) = self.managed.remove(addr) {
            managed.stop.notify_one();
            if let Err(e) = managed.task.await {
                tracing::warn!("storage server task for {} ended abnormally: {}", addr, e);
            }
        } else if let Err(e) = node_client.shutdown().await {
            tracing::warn!("remote shutdown of {} failed: {}", addr, e);
        }

        Ok(count)
    }

    /// Binds and serves a storage node in-process, registering its handle
    /// for graceful shutdown during RemoveNode.
    async fn start_local_node(&self, addr: &str) -> Result<(), ContentError> {
        let dir = self.base_dir.join(addr.replace(':', "_"));
        let store = BlobStore::open(&dir)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ContentError::Transport(format!("bind {addr}: {e}")))?;
        let node = Arc::new(StorageNode::new(store));
        let stop = node.stop_handle();
        let server_addr = addr.to_string();
        let task = tokio::spawn(async move {
            if let Err(e) = run_storage_node(listener, node).await {
                tracing::error!("storage server at {} stopped: {}", server_addr, e);
            }
        });
        self.managed
            .insert(addr.to_string(), ManagedNode { stop, task });
        tracing::info!("started storage node at {} under {}", addr, dir.display());
        Ok(())
    }
}

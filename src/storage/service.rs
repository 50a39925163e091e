use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::error::ContentError;
use crate::storage::client::StorageClient;
use crate::storage::handlers;
use crate::storage::protocol::{FileEntry, FileKey, MAX_MESSAGE_BYTES, storage_key};
use crate::storage::store::BlobStore;

/// How long a shutdown response gets to flush before the server stops.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// One storage node: the blob store plus the operations the wire layer
/// exposes. Peer transfers dial the peer's storage service through the same
/// shared HTTP client.
pub struct StorageNode {
    store: BlobStore,
    http: reqwest::Client,
    stop: Arc<Notify>,
}

impl StorageNode {
    pub fn new(store: BlobStore) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            stop: Arc::new(Notify::new()),
        }
    }

    /// Handle that resolves once a graceful stop has been requested, either
    /// by the `Shutdown` RPC or by whoever is running the server.
    pub fn stop_handle(&self) -> Arc<Notify> {
        self.stop.clone()
    }

    pub fn write_file(
        &self,
        video_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<(), ContentError> {
        if data.len() > MAX_MESSAGE_BYTES {
            return Err(ContentError::MessageTooLarge(data.len()));
        }
        self.store.put(video_id, filename, data)
    }

    pub async fn write_files(&self, entries: Vec<FileEntry>) -> Result<u64, ContentError> {
        for entry in &entries {
            if entry.data.len() > MAX_MESSAGE_BYTES {
                return Err(ContentError::MessageTooLarge(entry.data.len()));
            }
        }
        self.store.put_batch(&entries).await
    }

    pub fn read_file(&self, video_id: &str, filename: &str) -> Result<Vec<u8>, ContentError> {
        match self.store.get(video_id, filename)? {
            Some(data) => Ok(data),
            None => Err(ContentError::NotFound(format!("{video_id}/{filename}"))),
        }
    }

    pub fn read_files(&self) -> (Vec<FileEntry>, Option<ContentError>) {
        self.store.scan()
    }

    pub fn list_files(&self) -> (Vec<FileKey>, Option<ContentError>) {
        self.store.list()
    }

    /// Writes one entry to the peer, then deletes it locally. The delete only
    /// happens after the peer confirmed the write; a failed or cancelled call
    /// leaves the entry in place.
    pub async fn send_file(
        &self,
        peer_addr: &str,
        video_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), ContentError> {
        let peer = StorageClient::with_client(self.http.clone(), peer_addr);
        peer.write_file(video_id, filename, data).await?;
        let key = storage_key(video_id, filename);
        self.store.remove_keys([key.as_str()])?;
        tracing::info!("transferred {} to {}", key, peer_addr);
        Ok(())
    }

    /// Batch-writes the entries to the peer, then deletes the transferred
    /// keys locally. The peer applies the batch atomically and syncs it; the
    /// local deletes are unsynced because the data already lives on the peer.
    pub async fn send_files(
        &self,
        peer_addr: &str,
        entries: Vec<FileEntry>,
    ) -> Result<u64, ContentError> {
        let keys: Vec<String> = entries.iter().map(|e| e.key()).collect();
        let peer = StorageClient::with_client(self.http.clone(), peer_addr);
        let transferred = peer.write_files(entries).await?;
        self.store.remove_keys(keys.iter().map(|k| k.as_str()))?;
        tracing::info!("transferred {} entries to {}", transferred, peer_addr);
        Ok(transferred)
    }

    /// Flushes the store, then stops the RPC server after a brief delay so
    /// the response can flush back to the caller.
    pub async fn shutdown(&self) -> Result<(), ContentError> {
        tracing::info!("shutdown requested, flushing store");
        self.store.flush().await?;
        let stop = self.stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            stop.notify_one();
        });
        Ok(())
    }
}

/// Serves a node's storage RPCs on `listener` until a graceful stop is
/// requested through the node's stop handle. The store flushes when the node
/// is dropped on the way out.
pub async fn run_storage_node(
    listener: TcpListener,
    node: Arc<StorageNode>,
) -> std::io::Result<()> {
    let stop = node.stop_handle();
    let app = handlers::router(node);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            stop.notified().await;
        })
        .await
}

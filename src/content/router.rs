use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ContentError;
use crate::ring::hashring::{HashRing, fingerprint};
use crate::storage::client::StorageClient;
use crate::storage::protocol::{MAX_MESSAGE_BYTES, storage_key, validate_key};

/// Stateless router from a `(videoId, filename)` pair to the storage node
/// that owns it.
///
/// Holds only the shared ring reference and an HTTP client; every call
/// resolves the owner afresh, so ring changes made by the admin controller
/// take effect on the next request.
pub struct ContentRouter {
    ring: Arc<RwLock<HashRing>>,
    http: reqwest::Client,
}

impl ContentRouter {
    pub fn new(ring: Arc<RwLock<HashRing>>) -> Self {
        Self {
            ring,
            http: reqwest::Client::new(),
        }
    }

    async fn owner_of(&self, key: &str) -> Result<String, ContentError> {
        let ring = self.ring.read().await;
        Ok(ring.owner(fingerprint(key))?.to_string())
    }

    pub async fn read(&self, video_id: &str, filename: &str) -> Result<Vec<u8>, ContentError> {
        validate_key(video_id, filename)?;
        let key = storage_key(video_id, filename);
        let owner = self.owner_of(&key).await?;
        tracing::debug!("read {} from {}", key, owner);
        let client = StorageClient::with_client(self.http.clone(), &owner);
        client.read_file(video_id, filename).await
    }

    pub async fn write(
        &self,
        video_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), ContentError> {
        validate_key(video_id, filename)?;
        if data.len() > MAX_MESSAGE_BYTES {
            // Mirrors the server-side cap without shipping an undeliverable
            // payload across the wire first.
            return Err(ContentError::Transport(format!(
                "message of {} bytes exceeds the {} byte limit",
                data.len(),
                MAX_MESSAGE_BYTES
            )));
        }
        let key = storage_key(video_id, filename);
        let owner = self.owner_of(&key).await?;
        tracing::debug!("write {} ({} bytes) to {}", key, data.len(), owner);
        let client = StorageClient::with_client(self.http.clone(), &owner);
        client.write_file(video_id, filename, data).await
    }
}

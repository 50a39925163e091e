//! Content Service Module
//!
//! The read/write facade the web layer calls for blob content. Two
//! implementations share the contract:
//!
//! - **`router`**: the clustered service. Fingerprints the key, resolves the
//!   owning node through the shared hash ring, and issues a storage RPC.
//! - **`fs`**: the single-machine service, storing blobs under a local
//!   directory tree.

pub mod fs;
pub mod router;


use crate::error::ContentError;

/// Content backend selected by the web front-end at startup.
pub enum ContentService {
    Network(router::ContentRouter),
    Fs(fs::FsContentService),
}

impl ContentService {
    pub async fn read(&self, video_id: &str, filename: &str) -> Result<Vec<u8>, ContentError> {
        match self {
            ContentService::Network(router) => router.read(video_id, filename).await,
            ContentService::Fs(fs) => fs.read(video_id, filename).await,
        }
    }

    pub async fn write(
        &self,
        video_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), ContentError> {
        match self {
            ContentService::Network(router) => router.write(video_id, filename, data).await,
            ContentService::Fs(fs) => fs.write(video_id, filename, &data).await,
        }
    }
}

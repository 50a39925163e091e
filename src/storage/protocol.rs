//! Storage Wire Protocol
//!
//! Defines the endpoints and Data Transfer Objects of the
//! `VideoContentStorage` service: the RPC surface every storage node serves
//! and every router, controller, and peer node calls.
//!
//! Requests and responses are bincode-encoded and POSTed over HTTP. The
//! payload fields (`data`, `entries`) routinely carry whole DASH segments,
//! which rules out a textual encoding at this tier; the JSON control plane
//! lives in `admin::protocol`.

use serde::{Deserialize, Serialize};

use crate::error::ContentError;

// --- Message size limits ---

/// Largest single blob the wire carries. Sized for one DASH segment.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Headroom for the request envelope around a full-size blob: key strings,
/// length prefixes, HTTP framing.
pub const FRAME_ALLOWANCE_BYTES: usize = 1024 * 1024;

/// HTTP body limit enforced by every storage server and honored by clients.
pub const BODY_LIMIT_BYTES: usize = MAX_MESSAGE_BYTES + FRAME_ALLOWANCE_BYTES;

// --- API Endpoints ---

/// Overwrite a single key. May be non-durable (async disk sync).
pub const ENDPOINT_WRITE_FILE: &str = "/storage/write_file";
/// Atomic batch write, synced on commit.
pub const ENDPOINT_WRITE_FILES: &str = "/storage/write_files";
/// Read a single key.
pub const ENDPOINT_READ_FILE: &str = "/storage/read_file";
/// Full scan of the local store, keys and payloads.
pub const ENDPOINT_READ_FILES: &str = "/storage/read_files";
/// Full scan, keys only.
pub const ENDPOINT_LIST_FILES: &str = "/storage/list_files";
/// Write one entry to a peer, then delete it locally.
pub const ENDPOINT_SEND_FILE: &str = "/storage/send_file";
/// Batch-write entries to a peer, then delete them locally.
pub const ENDPOINT_SEND_FILES: &str = "/storage/send_files";
/// Flush the store and stop the server after the response flushes.
pub const ENDPOINT_SHUTDOWN: &str = "/storage/shutdown";

// --- Key encoding ---

/// Separator joining `videoId` and `filename` into a storage key. The only
/// reserved character; video ids must not contain it.
pub const KEY_SEPARATOR: char = '/';

/// Joins a blob identity into the key stored in the embedded KV store.
pub fn storage_key(video_id: &str, filename: &str) -> String {
    format!("{video_id}{KEY_SEPARATOR}{filename}")
}

/// Splits a storage key on the first separator. Keys without one are not
/// user data and are skipped during scans.
pub fn split_storage_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(KEY_SEPARATOR)
}

/// Rejects empty components and separator characters inside the video id.
pub fn validate_key(video_id: &str, filename: &str) -> Result<(), ContentError> {
    if video_id.is_empty() || filename.is_empty() || video_id.contains(KEY_SEPARATOR) {
        return Err(ContentError::InvalidKey(storage_key(video_id, filename)));
    }
    Ok(())
}

// --- Data Transfer Objects ---

/// One stored blob with its payload, as carried in batch operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub video_id: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl FileEntry {
    pub fn key(&self) -> String {
        storage_key(&self.video_id, &self.filename)
    }
}

/// Blob identity without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileKey {
    pub video_id: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteFileRequest {
    pub video_id: String,
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteFileResponse {}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteFilesRequest {
    pub entries: Vec<FileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteFilesResponse {
    /// Number of entries committed by the batch.
    pub written: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadFileRequest {
    pub video_id: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadFileResponse {
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadFilesRequest {}

/// Full-scan result. A partial scan reports the entries accumulated before
/// the iterator failed alongside the error, so callers can retry
/// idempotently.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadFilesResponse {
    pub entries: Vec<FileEntry>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListFilesRequest {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub keys: Vec<FileKey>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendFileRequest {
    /// Address of the node the entry is written to before the local delete.
    pub peer_addr: String,
    pub video_id: String,
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendFileResponse {}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendFilesRequest {
    pub peer_addr: String,
    pub entries: Vec<FileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendFilesResponse {
    /// Number of entries the peer confirmed written (and therefore deleted
    /// locally).
    pub transferred: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShutdownRequest {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShutdownResponse {}

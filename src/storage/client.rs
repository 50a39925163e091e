use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ContentError;
use crate::storage::protocol::*;

/// Typed client for the `VideoContentStorage` service of one node.
///
/// Construction is cheap; the underlying connection pool lives in the shared
/// `reqwest::Client`, so callers that dial a fresh node per request (the
/// router, the controller, a donor mid-transfer) create one of these per
/// call. Deadlines are supplied per client by the caller; the core imposes
/// no timeout of its own.
#[derive(Clone)]
pub struct StorageClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Option<Duration>,
}

impl StorageClient {
    pub fn new(addr: &str) -> Self {
        Self::with_client(reqwest::Client::new(), addr)
    }

    pub fn with_client(http: reqwest::Client, addr: &str) -> Self {
        Self {
            base_url: format!("http://{addr}"),
            http,
            timeout: None,
        }
    }

    /// Applies a deadline to every call made through this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn call<Req, Resp>(&self, endpoint: &str, req: &Req) -> Result<Resp, ContentError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body =
            bincode::serialize(req).map_err(|e| ContentError::Transport(e.to_string()))?;
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, endpoint))
            .body(body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes).into_owned();
            return Err(match status {
                StatusCode::NOT_FOUND => ContentError::NotFound(message),
                _ => ContentError::Transport(format!("{status}: {message}")),
            });
        }
        bincode::deserialize(&bytes).map_err(|e| ContentError::Transport(e.to_string()))
    }

    pub async fn write_file(
        &self,
        video_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), ContentError> {
        let req = WriteFileRequest {
            video_id: video_id.to_string(),
            filename: filename.to_string(),
            data,
        };
        let _: WriteFileResponse = self.call(ENDPOINT_WRITE_FILE, &req).await?;
        Ok(())
    }

    pub async fn write_files(&self, entries: Vec<FileEntry>) -> Result<u64, ContentError> {
        let req = WriteFilesRequest { entries };
        let resp: WriteFilesResponse = self.call(ENDPOINT_WRITE_FILES, &req).await?;
        Ok(resp.written)
    }

    pub async fn read_file(
        &self,
        video_id: &str,
        filename: &str,
    ) -> Result<Vec<u8>, ContentError> {
        let req = ReadFileRequest {
            video_id: video_id.to_string(),
            filename: filename.to_string(),
        };
        let resp: ReadFileResponse = self.call(ENDPOINT_READ_FILE, &req).await?;
        Ok(resp.data)
    }

    pub async fn read_files(&self) -> Result<ReadFilesResponse, ContentError> {
        self.call(ENDPOINT_READ_FILES, &ReadFilesRequest {}).await
    }

    pub async fn list_files(&self) -> Result<ListFilesResponse, ContentError> {
        self.call(ENDPOINT_LIST_FILES, &ListFilesRequest {}).await
    }

    pub async fn send_file(
        &self,
        peer_addr: &str,
        video_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), ContentError> {
        let req = SendFileRequest {
            peer_addr: peer_addr.to_string(),
            video_id: video_id.to_string(),
            filename: filename.to_string(),
            data,
        };
        let _: SendFileResponse = self.call(ENDPOINT_SEND_FILE, &req).await?;
        Ok(())
    }

    pub async fn send_files(
        &self,
        peer_addr: &str,
        entries: Vec<FileEntry>,
    ) -> Result<u64, ContentError> {
        let req = SendFilesRequest {
            peer_addr: peer_addr.to_string(),
            entries,
        };
        let resp: SendFilesResponse = self.call(ENDPOINT_SEND_FILES, &req).await?;
        Ok(resp.transferred)
    }

    pub async fn shutdown(&self) -> Result<(), ContentError> {
        let _: ShutdownResponse = self.call(ENDPOINT_SHUTDOWN, &ShutdownRequest {}).await?;
        Ok(())
    }
}

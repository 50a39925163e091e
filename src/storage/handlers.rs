//! Storage RPC Handlers
//!
//! HTTP endpoints that expose one node's [`StorageNode`] operations to the
//! network. Bodies are bincode on both sides; failures are reported as a
//! status code plus a plain-text message that the typed client maps back
//! into [`ContentError`] kinds.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ContentError;
use crate::storage::protocol::*;
use crate::storage::service::StorageNode;

/// Builds the `VideoContentStorage` router for one node.
pub fn router(node: Arc<StorageNode>) -> Router {
    Router::new()
        .route(ENDPOINT_WRITE_FILE, post(handle_write_file))
        .route(ENDPOINT_WRITE_FILES, post(handle_write_files))
        .route(ENDPOINT_READ_FILE, post(handle_read_file))
        .route(ENDPOINT_READ_FILES, post(handle_read_files))
        .route(ENDPOINT_LIST_FILES, post(handle_list_files))
        .route(ENDPOINT_SEND_FILE, post(handle_send_file))
        .route(ENDPOINT_SEND_FILES, post(handle_send_files))
        .route(ENDPOINT_SHUTDOWN, post(handle_shutdown))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(Extension(node))
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    bincode::deserialize(body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("malformed request: {e}")).into_response())
}

fn encode<T: Serialize>(value: &T) -> Response {
    match bincode::serialize(value) {
        Ok(bytes) => bytes.into_response(),
        Err(e) => {
            tracing::error!("failed to encode response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn error_response(err: ContentError) -> Response {
    (err.status(), err.to_string()).into_response()
}

pub async fn handle_write_file(
    Extension(node): Extension<Arc<StorageNode>>,
    body: Bytes,
) -> Response {
    let req: WriteFileRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match node.write_file(&req.video_id, &req.filename, &req.data) {
        Ok(()) => encode(&WriteFileResponse {}),
        Err(e) => {
            tracing::error!("write {}/{} failed: {}", req.video_id, req.filename, e);
            error_response(e)
        }
    }
}

pub async fn handle_write_files(
    Extension(node): Extension<Arc<StorageNode>>,
    body: Bytes,
) -> Response {
    let req: WriteFilesRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match node.write_files(req.entries).await {
        Ok(written) => encode(&WriteFilesResponse { written }),
        Err(e) => {
            tracing::error!("batch write failed: {}", e);
            error_response(e)
        }
    }
}

pub async fn handle_read_file(
    Extension(node): Extension<Arc<StorageNode>>,
    body: Bytes,
) -> Response {
    let req: ReadFileRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match node.read_file(&req.video_id, &req.filename) {
        Ok(data) => encode(&ReadFileResponse { data }),
        Err(e) => error_response(e),
    }
}

pub async fn handle_read_files(
    Extension(node): Extension<Arc<StorageNode>>,
    _body: Bytes,
) -> Response {
    let (entries, error) = node.read_files();
    if let Some(e) = &error {
        tracing::warn!("partial scan: returned {} entries, error {}", entries.len(), e);
    }
    encode(&ReadFilesResponse {
        entries,
        error: error.map(|e| e.to_string()),
    })
}

pub async fn handle_list_files(
    Extension(node): Extension<Arc<StorageNode>>,
    _body: Bytes,
) -> Response {
    let (keys, error) = node.list_files();
    tracing::info!("list: {} keys", keys.len());
    encode(&ListFilesResponse {
        keys,
        error: error.map(|e| e.to_string()),
    })
}

pub async fn handle_send_file(
    Extension(node): Extension<Arc<StorageNode>>,
    body: Bytes,
) -> Response {
    let req: SendFileRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match node
        .send_file(&req.peer_addr, &req.video_id, &req.filename, req.data)
        .await
    {
        Ok(()) => encode(&SendFileResponse {}),
        Err(e) => {
            tracing::error!("send to {} failed: {}", req.peer_addr, e);
            error_response(e)
        }
    }
}

pub async fn handle_send_files(
    Extension(node): Extension<Arc<StorageNode>>,
    body: Bytes,
) -> Response {
    let req: SendFilesRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    match node.send_files(&req.peer_addr, req.entries).await {
        Ok(transferred) => encode(&SendFilesResponse { transferred }),
        Err(e) => {
            tracing::error!("batch send to {} failed: {}", req.peer_addr, e);
            error_response(e)
        }
    }
}

pub async fn handle_shutdown(
    Extension(node): Extension<Arc<StorageNode>>,
    _body: Bytes,
) -> Response {
    match node.shutdown().await {
        Ok(()) => encode(&ShutdownResponse {}),
        Err(e) => error_response(e),
    }
}

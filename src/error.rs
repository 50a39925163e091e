//! Error vocabulary shared across the content plane.
//!
//! The core recovers nothing locally: every failure is reported to the caller
//! with enough context to decide whether to retry. Each variant maps to one
//! HTTP status so the wire layer and the in-process API agree on meaning.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    /// The key is absent on the owning node. The web layer maps this to 404.
    #[error("content {0} not found")]
    NotFound(String),

    /// Embedded key/value store failure. Retried by the caller at its
    /// discretion, never internally.
    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    /// RPC dial or call failure. There is no replica, so no failover.
    #[error("transport error: {0}")]
    Transport(String),

    /// Filesystem failure outside the embedded store.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Data-plane call with no storage nodes registered.
    #[error("no storage nodes registered")]
    EmptyRing,

    /// AddNode with an address (or node id) already on the ring.
    #[error("node {0} is already registered")]
    Collision(String),

    /// RemoveNode for an address that is not on the ring.
    #[error("node {0} is not registered")]
    UnknownNode(String),

    /// RemoveNode would leave the ring empty, with no receiver to drain to.
    #[error("cannot remove {0}: it is the only node in the ring")]
    LastNode(String),

    /// A single blob larger than the wire layer can carry.
    #[error("payload of {0} bytes exceeds the message size limit")]
    MessageTooLarge(usize),

    /// Malformed (videoId, filename) pair.
    #[error("invalid content key {0:?}: video id and filename must be non-empty and the video id must not contain '/'")]
    InvalidKey(String),
}

impl ContentError {
    /// Status code this error is reported with on the wire.
    pub fn status(&self) -> StatusCode {
        match self {
            ContentError::NotFound(_) => StatusCode::NOT_FOUND,
            ContentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ContentError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ContentError::Transport(_) => StatusCode::BAD_GATEWAY,
            ContentError::EmptyRing => StatusCode::SERVICE_UNAVAILABLE,
            ContentError::Collision(_) => StatusCode::CONFLICT,
            ContentError::UnknownNode(_) => StatusCode::NOT_FOUND,
            ContentError::LastNode(_) => StatusCode::CONFLICT,
            ContentError::MessageTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ContentError::InvalidKey(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<reqwest::Error> for ContentError {
    fn from(err: reqwest::Error) -> Self {
        ContentError::Transport(err.to_string())
    }
}

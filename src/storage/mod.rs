//! Storage Node Module
//!
//! Implements the key/value content service one storage daemon runs.
//!
//! ## Core Concepts
//! - **Persistence**: blobs live in an embedded ordered KV store (`sled`)
//!   under keys of the form `videoId/filename`, one directory per node.
//! - **Durability**: batch writes are applied atomically and synced on
//!   commit; single writes and post-transfer deletes ride the store's
//!   background sync.
//! - **Transfer**: `SendFile(s)` writes entries to a peer node and deletes
//!   them locally only once the peer confirmed, so a failed handoff never
//!   loses data (duplicates are the tolerated failure mode).
//! - **Wire**: requests and responses are bincode over HTTP; see `protocol`.

pub mod client;
pub mod handlers;
pub mod protocol;
pub mod service;
pub mod store;

//! Distributed Video Content Cluster Library
//!
//! This library crate defines the core modules of the content plane: a set of
//! storage nodes sharded by consistent hashing, plus the controller that
//! rebalances them. It serves as the foundation for the two binaries
//! (`storage` and `web`).
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`ring`**: The consistent-hash ring. Maps 64-bit key fingerprints to
//!   storage-node addresses with a "first id >= key, wrapping" successor rule.
//! - **`storage`**: The storage-node content service. Persists file blobs in
//!   an embedded ordered key/value store (`sled`) and exposes single, batched,
//!   scan, and peer-transfer operations over the wire.
//! - **`content`**: The content services used by the web layer. The network
//!   router resolves an owner through the ring and issues storage RPCs; a
//!   local-filesystem service covers single-machine deployments.
//! - **`admin`**: The cluster controller. Owns the authoritative ring, starts
//!   and stops locally managed nodes, and orchestrates file migration when
//!   nodes are added or removed.
//! - **`web`**: The front-end collaborators: the video metadata index
//!   (SQLite or etcd) and a minimal HTTP surface for uploads and playback.

pub mod admin;
pub mod content;
pub mod error;
pub mod ring;
pub mod storage;
pub mod web;

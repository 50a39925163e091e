//! Admin Controller Module
//!
//! The cluster's control plane. Owns the authoritative hash ring and the
//! registry of storage nodes started in-process, and orchestrates the file
//! migration that accompanies every membership change.
//!
//! ## Core Mechanisms
//! - **AddNode**: starts the node, computes the donor (the new node's ring
//!   successor) before mutating the ring, inserts the node, then moves the
//!   donor's matching keys over in one atomic batch transfer.
//! - **RemoveNode**: drains every entry to the node's ring successor, removes
//!   it from the ring, then stops it (graceful in-process stop, or a remote
//!   `Shutdown` RPC for daemons the controller did not start).
//! - **Serialization**: admin operations run one at a time; the ring itself
//!   is single-writer, many-reader.

pub mod controller;
pub mod handlers;
pub mod protocol;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::ops::Bound;

use sha2::{Digest, Sha256};

use crate::error::ContentError;

/// Hashes an arbitrary string onto the 64-bit ring keyspace.
///
/// First 8 bytes of SHA-256, interpreted big-endian. Used for both node
/// placement and key fingerprints so the tie-break rule in [`HashRing::owner`]
/// applies uniformly.
pub fn hash_to_u64(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Ring position of a storage node, derived from its `host:port` address.
pub fn node_id(addr: &str) -> u64 {
    hash_to_u64(addr)
}

/// Ring position of a stored blob, derived from its `videoId/filename` key.
pub fn fingerprint(storage_key: &str) -> u64 {
    hash_to_u64(storage_key)
}

/// The consistent-hash ring: an ordered set of node ids with their addresses.
///
/// Membership of the id sequence and the address mapping move together; the
/// `BTreeMap` keeps ids strictly increasing, so lookups and mutations are all
/// O(log n).
#[derive(Debug, Clone, Default)]
pub struct HashRing {
    nodes: BTreeMap<u64, String>,
}

impl HashRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ring from an initial member list, rejecting duplicates.
    pub fn with_nodes<I, S>(addrs: I) -> Result<Self, ContentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ring = Self::new();
        for addr in addrs {
            ring.add(addr.as_ref())?;
        }
        Ok(ring)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.nodes.get(&node_id(addr)).is_some_and(|a| a == addr)
    }

    /// Whether inserting `addr` would land on an occupied ring position,
    /// either because the address is present or because of an id collision.
    pub fn would_collide(&self, addr: &str) -> bool {
        self.nodes.contains_key(&node_id(addr))
    }

    /// Inserts a node, returning its ring id.
    pub fn add(&mut self, addr: &str) -> Result<u64, ContentError> {
        let id = node_id(addr);
        if self.nodes.contains_key(&id) {
            return Err(ContentError::Collision(addr.to_string()));
        }
        self.nodes.insert(id, addr.to_string());
        Ok(id)
    }

    /// Removes a node, returning the ring id it occupied.
    pub fn remove(&mut self, addr: &str) -> Result<u64, ContentError> {
        let id = node_id(addr);
        match self.nodes.get(&id) {
            Some(existing) if existing == addr => {
                self.nodes.remove(&id);
                Ok(id)
            }
            _ => Err(ContentError::UnknownNode(addr.to_string())),
        }
    }

    /// Address of the node owning `key`: the first id such that `key <= id`,
    /// wrapping to the smallest id when the key exceeds the largest.
    ///
    /// This tie-break is load-bearing for migration: looked up with a new
    /// node's own id before that node is inserted, it yields the ring
    /// successor that currently holds every key the new node will own.
    pub fn owner(&self, key: u64) -> Result<&str, ContentError> {
        self.nodes
            .range(key..)
            .next()
            .or_else(|| self.nodes.iter().next())
            .map(|(_, addr)| addr.as_str())
            .ok_or(ContentError::EmptyRing)
    }

    /// Address of the node with the smallest id strictly greater than `id`,
    /// wrapping past the end of the keyspace. With a single member this wraps
    /// back to that member itself.
    pub fn successor(&self, id: u64) -> Option<&str> {
        self.nodes
            .range((Bound::Excluded(id), Bound::Unbounded))
            .next()
            .or_else(|| self.nodes.iter().next())
            .map(|(_, addr)| addr.as_str())
    }

    /// Current membership in ring (ascending node id) order.
    pub fn nodes(&self) -> Vec<String> {
        self.nodes.values().cloned().collect()
    }
}

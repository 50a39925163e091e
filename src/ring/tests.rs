use super::hashring::{HashRing, fingerprint, node_id};
use crate::error::ContentError;

fn test_addrs(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("127.0.0.1:{}", 9001 + i)).collect()
}

fn test_keys(count: usize) -> Vec<u64> {
    (0..count)
        .map(|i| fingerprint(&format!("video-{i}/seg-{i:04}.m4s")))
        .collect()
}

// ============================================================
// HASHING
// ============================================================

#[test]
fn test_hash_is_deterministic() {
    assert_eq!(node_id("127.0.0.1:9001"), node_id("127.0.0.1:9001"));
    assert_ne!(node_id("127.0.0.1:9001"), node_id("127.0.0.1:9002"));
}

#[test]
fn test_node_and_key_hash_share_the_keyspace() {
    // The same string must land on the same ring position whether it names
    // a node or a key; the migration donor lookup depends on it.
    assert_eq!(node_id("cat/init.m4s"), fingerprint("cat/init.m4s"));
}

// ============================================================
// RING LAWS
// ============================================================

#[test]
fn test_owner_of_a_member_id_is_that_member() {
    let addrs = test_addrs(5);
    let ring = HashRing::with_nodes(&addrs).unwrap();

    for addr in &addrs {
        let owner = ring.owner(node_id(addr)).unwrap();
        assert_eq!(owner, addr, "a node must own its own ring position");
    }
}

#[test]
fn test_owner_is_always_a_member() {
    let addrs = test_addrs(4);
    let ring = HashRing::with_nodes(&addrs).unwrap();

    for key in test_keys(1000) {
        let owner = ring.owner(key).unwrap().to_string();
        assert!(addrs.contains(&owner), "owner {owner} is not a member");
    }
}

#[test]
fn test_insert_is_monotone() {
    // Adding one node may only move keys onto that node, never between two
    // pre-existing ones.
    let addrs = test_addrs(4);
    let before = HashRing::with_nodes(&addrs).unwrap();
    let mut after = before.clone();
    let new_addr = "127.0.0.1:9100";
    after.add(new_addr).unwrap();

    for key in test_keys(1000) {
        let old_owner = before.owner(key).unwrap();
        let new_owner = after.owner(key).unwrap();
        assert!(
            new_owner == old_owner || new_owner == new_addr,
            "key {key} moved from {old_owner} to {new_owner}, bypassing the inserted node"
        );
    }
}

#[test]
fn test_removal_moves_keys_to_the_successor_only() {
    let addrs = test_addrs(5);
    let before = HashRing::with_nodes(&addrs).unwrap();
    let removed = &addrs[2];
    let inherited_by = before.successor(node_id(removed)).unwrap().to_string();
    assert_ne!(&inherited_by, removed);

    let mut after = before.clone();
    after.remove(removed).unwrap();

    for key in test_keys(1000) {
        let old_owner = before.owner(key).unwrap().to_string();
        let new_owner = after.owner(key).unwrap();
        if &old_owner == removed {
            assert_eq!(new_owner, inherited_by, "key {key} skipped the ring successor");
        } else {
            assert_eq!(new_owner, old_owner, "key {key} moved although its owner stayed");
        }
    }
}

// ============================================================
// TIE-BREAK AND WRAP-AROUND
// ============================================================

#[test]
fn test_lookup_wraps_past_the_largest_id() {
    let ring = HashRing::with_nodes(test_addrs(5)).unwrap();
    let entries: Vec<(u64, String)> = ring
        .nodes()
        .into_iter()
        .map(|addr| (node_id(&addr), addr))
        .collect();
    let (smallest_id, first) = entries.first().unwrap().clone();
    let (largest_id, _) = entries.last().unwrap().clone();
    assert!(largest_id < u64::MAX, "fixture ids must leave wrap room");

    assert_eq!(ring.owner(largest_id + 1).unwrap(), first);
    assert_eq!(ring.owner(u64::MAX).unwrap(), first);
    // Key zero belongs to the smallest id by the first-id-at-or-above rule.
    assert_eq!(ring.owner(0).unwrap(), ring.owner(smallest_id).unwrap());
}

#[test]
fn test_successor_is_strictly_greater_and_wraps() {
    let ring = HashRing::with_nodes(test_addrs(3)).unwrap();
    let nodes = ring.nodes();

    for (i, addr) in nodes.iter().enumerate() {
        let next = &nodes[(i + 1) % nodes.len()];
        assert_eq!(ring.successor(node_id(addr)).unwrap(), next);
    }
}

// ============================================================
// MEMBERSHIP
// ============================================================

#[test]
fn test_membership_is_order_independent() {
    let forward = HashRing::with_nodes(["127.0.0.1:9001", "127.0.0.1:9002"]).unwrap();
    let reverse = HashRing::with_nodes(["127.0.0.1:9002", "127.0.0.1:9001"]).unwrap();

    assert_eq!(forward.nodes(), reverse.nodes());
    for key in test_keys(100) {
        assert_eq!(forward.owner(key).unwrap(), reverse.owner(key).unwrap());
    }
}

#[test]
fn test_nodes_are_listed_in_ascending_id_order() {
    let ring = HashRing::with_nodes(test_addrs(6)).unwrap();
    let ids: Vec<u64> = ring.nodes().iter().map(|a| node_id(a)).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_duplicate_add_is_rejected() {
    let mut ring = HashRing::new();
    ring.add("127.0.0.1:9001").unwrap();
    let err = ring.add("127.0.0.1:9001").unwrap_err();
    assert!(matches!(err, ContentError::Collision(_)));
    assert_eq!(ring.len(), 1);
}

#[test]
fn test_remove_of_unknown_node_is_rejected() {
    let mut ring = HashRing::with_nodes(["127.0.0.1:9001"]).unwrap();
    let err = ring.remove("127.0.0.1:9999").unwrap_err();
    assert!(matches!(err, ContentError::UnknownNode(_)));
    assert_eq!(ring.len(), 1);
}

#[test]
fn test_empty_ring_has_no_owner() {
    let ring = HashRing::new();
    assert!(matches!(ring.owner(42), Err(ContentError::EmptyRing)));
    assert!(ring.successor(42).is_none());
}

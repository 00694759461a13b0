//! # OSM Way-Id B+-Tree
//!
//! Sparse B+-tree keyed by OSM way id; values locate the parcel holding the
//! way. The tree is bulk-built bottom-up from the sorted triple array and
//! serialized as one parcel per node under `PID_WAYIDX`.
//!
//! ## Shape
//!
//! - Fan-out 64: an internal node holds up to 64 keys and 65 children.
//! - Leaves are filled at 48 entries (3/4) so archives extended later have
//!   insertion headroom.
//! - Separators are the first key of each child (skipping a node's first
//!   child), so keys inside an internal node are strictly increasing and
//!   every leaf's first key equals or exceeds its parent separator.
//!
//! ## Node Payload
//!
//! ```text
//! kind       u8    0 = leaf, 1 = internal
//! level      u8    0 for leaves
//! count      u16
//! next_leaf  u32   right sibling parcel offset; END_OF_CHAIN for the last
//!                  leaf and for internal nodes
//! leaf:      count x { key u64, file_index u16, offset u32 }
//! internal:  count x key u64, then (count+1) x child u32
//! ```
//!
//! Child and sibling offsets are file-relative parcel offsets. Nodes are
//! sealed in level order, root level first, which also makes the
//! `next_offset` chain of `PID_WAYIDX` run in level order.

use eyre::{ensure, Result};

use crate::config::{BTREE_FANOUT, BTREE_LEAF_FILL, END_OF_CHAIN};
use crate::format::headers::{PID_WAYIDX, PCL_HEADER_SIZE};
use crate::format::ParcelArea;
use crate::index::spill::WayTriple;

pub const NODE_KIND_LEAF: u8 = 0;
pub const NODE_KIND_INTERNAL: u8 = 1;
pub const NODE_FIXED_HEADER: usize = 8;
pub const LEAF_ENTRY_SIZE: usize = 14;

struct PlannedNode {
    kind: u8,
    level: u8,
    /// Leaf: range into the triple slice. Internal: range of child node ids.
    range: std::ops::Range<usize>,
    first_key: u64,
}

/// Builds and seals the tree; returns the root parcel offset, or `None` for
/// an empty input.
pub fn build(triples: &[WayTriple], area: &mut ParcelArea) -> Result<Option<u32>> {
    if triples.is_empty() {
        return Ok(None);
    }
    debug_assert!(triples.windows(2).all(|w| w[0].way_id() < w[1].way_id()));

    // Plan leaves, then stack internal levels until one node remains.
    let mut nodes: Vec<PlannedNode> = Vec::new();
    let mut current_level: Vec<usize> = Vec::new();
    for (i, chunk_start) in (0..triples.len()).step_by(BTREE_LEAF_FILL).enumerate() {
        let end = (chunk_start + BTREE_LEAF_FILL).min(triples.len());
        nodes.push(PlannedNode {
            kind: NODE_KIND_LEAF,
            level: 0,
            range: chunk_start..end,
            first_key: triples[chunk_start].way_id(),
        });
        current_level.push(i);
    }

    let mut level = 0u8;
    while current_level.len() > 1 {
        level += 1;
        ensure!(level < 16, "B+-tree deeper than any valid archive");
        let mut next_level = Vec::new();
        for group in current_level.chunks(BTREE_FANOUT + 1) {
            let node_id = nodes.len();
            let first_child = group[0];
            nodes.push(PlannedNode {
                kind: NODE_KIND_INTERNAL,
                level,
                range: first_child..first_child + group.len(),
                first_key: nodes[first_child].first_key,
            });
            next_level.push(node_id);
        }
        current_level = next_level;
    }

    // Serialization order: level order, root level first.
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by(|&a, &b| {
        nodes[b]
            .level
            .cmp(&nodes[a].level)
            .then_with(|| nodes[a].range.start.cmp(&nodes[b].range.start))
    });

    // Every node's parcel size is known up front, so offsets can be assigned
    // before any node is serialized.
    let unit = area.unit_size() as usize;
    let mut offsets = vec![0u32; nodes.len()];
    let mut cursor = area.next_parcel_offset() as usize;
    for &id in &order {
        offsets[id] = cursor as u32;
        let payload = node_payload_len(&nodes[id]);
        let framed = PCL_HEADER_SIZE + payload;
        cursor += framed + (framed.wrapping_neg() & (unit - 1));
    }

    for &id in &order {
        let node = &nodes[id];
        let mut payload = Vec::with_capacity(node_payload_len(node));
        payload.push(node.kind);
        payload.push(node.level);

        match node.kind {
            NODE_KIND_LEAF => {
                let entries = &triples[node.range.clone()];
                payload.extend_from_slice(&(entries.len() as u16).to_le_bytes());
                let next = if node.range.end < triples.len() {
                    // The right sibling leaf is the node planned immediately
                    // after this one.
                    offsets[id + 1]
                } else {
                    END_OF_CHAIN
                };
                payload.extend_from_slice(&next.to_le_bytes());
                for t in entries {
                    payload.extend_from_slice(&t.way_id().to_le_bytes());
                    payload.extend_from_slice(&t.file_index().to_le_bytes());
                    payload.extend_from_slice(&t.offset().to_le_bytes());
                }
            }
            _ => {
                let children = node.range.clone();
                let key_count = children.len() - 1;
                payload.extend_from_slice(&(key_count as u16).to_le_bytes());
                payload.extend_from_slice(&END_OF_CHAIN.to_le_bytes());
                for child in children.clone().skip(1) {
                    payload.extend_from_slice(&nodes[child].first_key.to_le_bytes());
                }
                for child in children {
                    payload.extend_from_slice(&offsets[child].to_le_bytes());
                }
            }
        }

        let sealed = area.seal(PID_WAYIDX, &payload)?;
        debug_assert_eq!(sealed, offsets[id], "planned and sealed offsets diverged");
    }

    let root = *order.first().expect("non-empty input implies a root");
    Ok(Some(offsets[root]))
}

fn node_payload_len(node: &PlannedNode) -> usize {
    match node.kind {
        NODE_KIND_LEAF => NODE_FIXED_HEADER + node.range.len() * LEAF_ENTRY_SIZE,
        _ => {
            let children = node.range.len();
            NODE_FIXED_HEADER + (children - 1) * 8 + children * 4
        }
    }
}

/// Parsed view of one node payload; used by verification and tests.
#[derive(Debug)]
pub struct NodeView<'a> {
    pub kind: u8,
    pub level: u8,
    pub count: u16,
    pub next_leaf: u32,
    body: &'a [u8],
}

impl<'a> NodeView<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        ensure!(
            payload.len() >= NODE_FIXED_HEADER,
            "B+-tree node payload of {} bytes is shorter than its header",
            payload.len()
        );
        let kind = payload[0];
        let level = payload[1];
        let count = u16::from_le_bytes([payload[2], payload[3]]);
        let next_leaf = u32::from_le_bytes(payload[4..8].try_into().unwrap());
        let body = &payload[NODE_FIXED_HEADER..];
        let expected = match kind {
            NODE_KIND_LEAF => count as usize * LEAF_ENTRY_SIZE,
            NODE_KIND_INTERNAL => count as usize * 8 + (count as usize + 1) * 4,
            other => eyre::bail!("unknown B+-tree node kind {}", other),
        };
        ensure!(
            body.len() == expected,
            "B+-tree node body is {} bytes, expected {}",
            body.len(),
            expected
        );
        Ok(Self {
            kind,
            level,
            count,
            next_leaf,
            body,
        })
    }

    pub fn leaf_entry(&self, i: usize) -> (u64, u16, u32) {
        let at = i * LEAF_ENTRY_SIZE;
        let e = &self.body[at..at + LEAF_ENTRY_SIZE];
        (
            u64::from_le_bytes(e[0..8].try_into().unwrap()),
            u16::from_le_bytes([e[8], e[9]]),
            u32::from_le_bytes(e[10..14].try_into().unwrap()),
        )
    }

    pub fn key(&self, i: usize) -> u64 {
        let at = i * 8;
        u64::from_le_bytes(self.body[at..at + 8].try_into().unwrap())
    }

    pub fn child(&self, i: usize) -> u32 {
        let at = self.count as usize * 8 + i * 4;
        u32::from_le_bytes(self.body[at..at + 4].try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_UNIT_SIZE;
    use crate::format::PclHdr;

    fn triples(n: usize) -> Vec<WayTriple> {
        (0..n)
            .map(|i| WayTriple::new(i as u64 * 3 + 1, 0, 512 + (i as u32 % 7) * 2048))
            .collect()
    }

    fn parcel_payload(image: &[u8], offset: u32) -> &[u8] {
        let hdr = PclHdr::from_bytes(&image[offset as usize..]).unwrap();
        let start = offset as usize + PCL_HEADER_SIZE;
        &image[start..start + hdr.payload_len() as usize]
    }

    #[test]
    fn empty_input_builds_no_tree() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        assert!(build(&[], &mut area).unwrap().is_none());
        assert!(area.is_empty());
    }

    #[test]
    fn few_entries_build_a_single_leaf_root() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let input = triples(5);
        let root = build(&input, &mut area).unwrap().unwrap();
        assert_eq!(root, 512);

        let image = area.finish(&[0u8; 512]);
        let node = NodeView::parse(parcel_payload(&image, root)).unwrap();
        assert_eq!(node.kind, NODE_KIND_LEAF);
        assert_eq!(node.count, 5);
        assert_eq!(node.next_leaf, END_OF_CHAIN);
        assert_eq!(node.leaf_entry(0).0, 1);
        assert_eq!(node.leaf_entry(4).0, 13);
    }

    #[test]
    fn leaves_fill_at_three_quarters() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let input = triples(100);
        let root = build(&input, &mut area).unwrap().unwrap();
        let image = area.finish(&[0u8; 512]);

        // 100 entries -> leaves of 48, 48, 4 under one root.
        let root_node = NodeView::parse(parcel_payload(&image, root)).unwrap();
        assert_eq!(root_node.kind, NODE_KIND_INTERNAL);
        assert_eq!(root_node.count, 2);

        let first_leaf = NodeView::parse(parcel_payload(&image, root_node.child(0))).unwrap();
        assert_eq!(first_leaf.kind, NODE_KIND_LEAF);
        assert_eq!(first_leaf.count, 48);
        let last_leaf = NodeView::parse(parcel_payload(&image, root_node.child(2))).unwrap();
        assert_eq!(last_leaf.count, 4);
    }

    #[test]
    fn separators_are_first_keys_of_right_children() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let input = triples(100);
        let root = build(&input, &mut area).unwrap().unwrap();
        let image = area.finish(&[0u8; 512]);

        let root_node = NodeView::parse(parcel_payload(&image, root)).unwrap();
        for i in 0..root_node.count as usize {
            let sep = root_node.key(i);
            let child = NodeView::parse(parcel_payload(&image, root_node.child(i + 1))).unwrap();
            assert_eq!(child.leaf_entry(0).0, sep);
        }
        // Keys strictly increasing.
        for i in 1..root_node.count as usize {
            assert!(root_node.key(i - 1) < root_node.key(i));
        }
    }

    #[test]
    fn leaf_sibling_links_enable_range_scans() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let input = triples(100);
        let root = build(&input, &mut area).unwrap().unwrap();
        let image = area.finish(&[0u8; 512]);

        let root_node = NodeView::parse(parcel_payload(&image, root)).unwrap();
        let mut at = root_node.child(0);
        let mut seen = Vec::new();
        loop {
            let leaf = NodeView::parse(parcel_payload(&image, at)).unwrap();
            assert_eq!(leaf.kind, NODE_KIND_LEAF);
            for i in 0..leaf.count as usize {
                seen.push(leaf.leaf_entry(i).0);
            }
            if leaf.next_leaf == END_OF_CHAIN {
                break;
            }
            at = leaf.next_leaf;
        }
        let expected: Vec<u64> = input.iter().map(|t| t.way_id()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn nodes_chain_in_level_order() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let input = triples(100);
        let root = build(&input, &mut area).unwrap().unwrap();
        let image = area.finish(&[0u8; 512]);

        // The chain starts at the root (sealed first) and visits every node.
        let mut at = root;
        let mut kinds = Vec::new();
        loop {
            let hdr = PclHdr::from_bytes(&image[at as usize..]).unwrap();
            assert_eq!(hdr.pid(), PID_WAYIDX);
            let node = NodeView::parse(parcel_payload(&image, at)).unwrap();
            kinds.push(node.kind);
            if hdr.ends_chain() {
                break;
            }
            at = hdr.next_offset();
        }
        assert_eq!(kinds, vec![NODE_KIND_INTERNAL, NODE_KIND_LEAF, NODE_KIND_LEAF, NODE_KIND_LEAF]);
    }
}

//! # Two-Level Spatial KD-Tree
//!
//! The spatial index is a fixed-shape KD-tree over bounding boxes: one
//! median split on longitude, one on latitude inside each half, then
//! leaves. Regional trees index the region's road parcels; the global tree
//! indexes whole regions. Both serialize into a single index parcel whose
//! payload starts with the 16-byte bounding box (the `IdxPclHdr_t` view),
//! followed by a count and fixed 40-byte node records in pre-order.
//!
//! ## Node Record
//!
//! ```text
//! axis          u8     0 = longitude, 1 = latitude
//! reserved      u8
//! region_id     u16
//! split         i32    microdegrees
//! left, right   u32    payload-relative child offsets; both 0 => leaf
//! pid           u16    leaf: referenced chain's PID
//! reserved2     [u8;2]
//! chain_offset  u32    leaf: file-relative first-parcel offset
//! bbox          4xi32  covered bounding box
//! ```
//!
//! ## Shape Rules
//!
//! - Median split of the items sorted by centroid on the split axis; stable
//!   sort, so equal coordinates preserve input order.
//! - Even counts put the extra element in the lower half (for odd counts;
//!   even counts split evenly).
//! - A half with a single item becomes a leaf immediately, so degenerate
//!   inputs (one parcel, one region) produce a single leaf record.
//! - When the covering box wraps the anti-meridian, longitudes are unwrapped
//!   by +360 degrees before the median and the recorded split value is
//!   wrapped back; the split therefore follows the shorter arc.

use eyre::{ensure, Result};
use zerocopy::little_endian::{I32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::format::headers::bbox_prefix;
use crate::format::ParcelArea;
use crate::geo::{self, wrap_lon, Bbox, CIRCLE_MICRODEG};

pub const AXIS_LON: u8 = 0;
pub const AXIS_LAT: u8 = 1;
pub const KD_NODE_SIZE: usize = 40;
/// Payload offset of the first node record: bbox prefix + count + reserved.
pub const KD_NODES_START: usize = 24;

/// One indexed item: a parcel chain (regional tree) or a region (global
/// tree).
#[derive(Debug, Clone, Copy)]
pub struct KdItem {
    pub bbox: Bbox,
    pub region_id: u16,
    pub pid: u16,
    pub chain_offset: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct KdNodeRec {
    axis: u8,
    reserved: u8,
    region_id: U16,
    split: I32,
    left: U32,
    right: U32,
    pid: U16,
    reserved2: [u8; 2],
    chain_offset: U32,
    min_lat: I32,
    min_lon: I32,
    max_lat: I32,
    max_lon: I32,
}

const _: () = assert!(std::mem::size_of::<KdNodeRec>() == KD_NODE_SIZE);

impl KdNodeRec {
    zerocopy_getters! {
        region_id: u16,
        split: i32,
        left: u32,
        right: u32,
        pid: u16,
        chain_offset: u32,
    }

    #[inline]
    pub fn axis(&self) -> u8 {
        self.axis
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left.get() == 0 && self.right.get() == 0
    }

    pub fn bbox(&self) -> Bbox {
        Bbox {
            min_lat: self.min_lat.get(),
            min_lon: self.min_lon.get(),
            max_lat: self.max_lat.get(),
            max_lon: self.max_lon.get(),
        }
    }

    fn leaf(item_bbox: Bbox, region_id: u16, pid: u16, chain_offset: u32) -> Self {
        Self {
            axis: 0,
            reserved: 0,
            region_id: U16::new(region_id),
            split: I32::new(0),
            left: U32::new(0),
            right: U32::new(0),
            pid: U16::new(pid),
            reserved2: [0; 2],
            chain_offset: U32::new(chain_offset),
            min_lat: I32::new(item_bbox.min_lat),
            min_lon: I32::new(item_bbox.min_lon),
            max_lat: I32::new(item_bbox.max_lat),
            max_lon: I32::new(item_bbox.max_lon),
        }
    }

    fn split_node(axis: u8, split: i32, bbox: Bbox) -> Self {
        Self {
            axis,
            reserved: 0,
            region_id: U16::new(0),
            split: I32::new(split),
            left: U32::new(0),
            right: U32::new(0),
            pid: U16::new(0),
            reserved2: [0; 2],
            chain_offset: U32::new(0),
            min_lat: I32::new(bbox.min_lat),
            min_lon: I32::new(bbox.min_lon),
            max_lat: I32::new(bbox.max_lat),
            max_lon: I32::new(bbox.max_lon),
        }
    }
}

/// Builds the pre-order node records for `items`.
pub fn build_records(items: &[KdItem]) -> Result<Vec<KdNodeRec>> {
    ensure!(!items.is_empty(), "KD-tree build over zero items");
    let mut records = Vec::new();
    let mut items = items.to_vec();
    build_node(&mut items, 0, &mut records)?;
    Ok(records)
}

/// Serializes the records into an index parcel in `area` and returns its
/// offset.
pub fn seal_parcel(pid: u16, items: &[KdItem], area: &mut ParcelArea) -> Result<u32> {
    let records = build_records(items)?;
    let boxes: Vec<Bbox> = items.iter().map(|i| i.bbox).collect();
    let total = geo::union(&boxes).expect("items are non-empty");

    let mut payload = Vec::with_capacity(KD_NODES_START + records.len() * KD_NODE_SIZE);
    payload.extend_from_slice(&bbox_prefix(&total));
    payload.extend_from_slice(&(records.len() as u16).to_le_bytes());
    payload.extend_from_slice(&[0u8; 6]);
    for rec in &records {
        payload.extend_from_slice(rec.as_bytes());
    }
    area.seal(pid, &payload)
}

/// Parses an index parcel payload back into its bbox and node records.
pub fn parse_payload(payload: &[u8]) -> Result<(Bbox, &[KdNodeRec])> {
    ensure!(
        payload.len() >= KD_NODES_START,
        "index payload of {} bytes is shorter than its header",
        payload.len()
    );
    let bbox = Bbox {
        min_lat: i32::from_le_bytes(payload[0..4].try_into().unwrap()),
        min_lon: i32::from_le_bytes(payload[4..8].try_into().unwrap()),
        max_lat: i32::from_le_bytes(payload[8..12].try_into().unwrap()),
        max_lon: i32::from_le_bytes(payload[12..16].try_into().unwrap()),
    };
    let count = u16::from_le_bytes([payload[16], payload[17]]) as usize;
    let body = &payload[KD_NODES_START..];
    ensure!(
        body.len() == count * KD_NODE_SIZE,
        "index payload body is {} bytes, expected {} records",
        body.len(),
        count
    );
    let records = <[KdNodeRec]>::ref_from_bytes(body)
        .map_err(|e| eyre::eyre!("failed to parse KD node records: {:?}", e))?;
    Ok((bbox, records))
}

/// Payload-relative offset of record `idx`.
#[inline]
pub fn node_offset(idx: usize) -> u32 {
    (KD_NODES_START + idx * KD_NODE_SIZE) as u32
}

fn build_node(items: &mut [KdItem], depth: u8, out: &mut Vec<KdNodeRec>) -> Result<usize> {
    if items.len() == 1 || depth == 2 {
        return Ok(push_leaf(items, out));
    }

    let axis = if depth == 0 { AXIS_LON } else { AXIS_LAT };
    let boxes: Vec<Bbox> = items.iter().map(|i| i.bbox).collect();
    let cover = geo::union(&boxes).expect("split sets are non-empty");

    // Stable sort by centroid; wrapping covers unwrap longitudes so the
    // order follows the shorter arc.
    let keys: Vec<i64> = items
        .iter()
        .map(|i| axis_coord(&i.bbox, axis, &cover))
        .collect();
    let mut idx: Vec<usize> = (0..items.len()).collect();
    idx.sort_by_key(|&i| keys[i]);
    let sorted: Vec<KdItem> = idx.iter().map(|&i| items[i]).collect();
    items.copy_from_slice(&sorted);

    let lower = items.len().div_ceil(2);
    let split_raw = axis_coord(&items[lower].bbox, axis, &cover);
    let split = if axis == AXIS_LON {
        wrap_lon(split_raw)
    } else {
        split_raw as i32
    };

    let me = out.len();
    out.push(KdNodeRec::split_node(axis, split, cover));

    let (lo, hi) = items.split_at_mut(lower);
    let left = build_node(lo, depth + 1, out)?;
    let right = build_node(hi, depth + 1, out)?;
    out[me].left = U32::new(node_offset(left));
    out[me].right = U32::new(node_offset(right));
    Ok(me)
}

/// A leaf covers its items' united box and references the chain starting at
/// the lowest contained parcel offset.
fn push_leaf(items: &[KdItem], out: &mut Vec<KdNodeRec>) -> usize {
    let boxes: Vec<Bbox> = items.iter().map(|i| i.bbox).collect();
    let bbox = geo::union(&boxes).expect("leaf sets are non-empty");
    let anchor = items
        .iter()
        .min_by_key(|i| (i.chain_offset, i.region_id))
        .expect("leaf sets are non-empty");
    let me = out.len();
    out.push(KdNodeRec::leaf(
        bbox,
        anchor.region_id,
        anchor.pid,
        anchor.chain_offset,
    ));
    me
}

/// Centroid coordinate on `axis`, unwrapped against the covering box when
/// the longitude range wraps.
fn axis_coord(bbox: &Bbox, axis: u8, cover: &Bbox) -> i64 {
    let (lat, lon) = bbox.centroid();
    if axis == AXIS_LAT {
        return lat as i64;
    }
    let mut v = lon as i64;
    if cover.wraps() && v < cover.min_lon as i64 {
        v += CIRCLE_MICRODEG;
    }
    v
}

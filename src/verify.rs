//! # Post-Build Self-Verification
//!
//! Re-reads the assembled file images and checks the structural invariants
//! the firmware relies on:
//!
//! 1. every parcel's CRC matches its payload;
//! 2. every PID chain reachable from a region header terminates and visits
//!    each parcel of that PID exactly once (SDAL mode, where the chains are
//!    rooted in `RgnHdr_t`);
//! 3. every `CARTOTOP.SDL` directory entry's `db_id` matches the id
//!    embedded in the referenced map file's first road parcel;
//! 4. the global KD-tree's leaf boxes union to the union of the region
//!    boxes and its leaves reference live parcels;
//! 5. B+-tree nodes are key-ordered with separators bounding their
//!    children;
//! 6. every stored offset lands on a parseable header with a known PID;
//! 7. the media header carries the `"SDAL"` magic and version 1.7.
//!
//! Any mismatch aborts the build as `VerificationFailed`.

use std::collections::BTreeMap;

use eyre::{bail, ensure, Result};

use crate::build::{BuildOptions, FormatMode};
use crate::config::{END_OF_CHAIN, FILE_PREFIX_SIZE};
use crate::error::BuildError;
use crate::format::headers::{
    is_known_pid, GlbMediaHeader, IdxPclHdr, PclHdr, RegionDirEntry, RgnHdr, PCL_HEADER_SIZE,
    PID_CARTOTOP, PID_NAV, PID_WAYIDX, REGION_DIR_ENTRY_SIZE,
};
use crate::format::payload_crc;
use crate::geo::{self, Bbox};
use crate::index::kdtree;
use crate::index::wayidx::{NodeView, NODE_KIND_INTERNAL, NODE_KIND_LEAF};

/// Files that are baked tables rather than parcel streams.
const NON_PARCEL_FILES: [&str; 2] = ["REGIONS.SDL", "MTOC.SDL"];

pub fn verify_files(files: &BTreeMap<String, Vec<u8>>, opts: &BuildOptions) -> Result<()> {
    run(files, opts).map_err(|e| {
        BuildError::VerificationFailed {
            detail: format!("{e:#}"),
        }
        .into()
    })
}

fn run(files: &BTreeMap<String, Vec<u8>>, opts: &BuildOptions) -> Result<()> {
    let init = files
        .get("INIT.SDL")
        .ok_or_else(|| eyre::eyre!("INIT.SDL missing from media set"))?;
    let media = GlbMediaHeader::from_bytes(init)?;

    for (name, image) in files {
        if NON_PARCEL_FILES.contains(&name.as_str()) {
            continue;
        }
        let parcels = walk_linear(name, image, opts.unit_size)?;
        if opts.format_mode == FormatMode::Sdal && name != "INIT.SDL" {
            verify_chains(name, image, &parcels)?;
        }
    }

    let entries = directory_entries(files, media.cartotop_ptr())?;
    ensure!(
        entries.len() == media.region_count() as usize,
        "directory holds {} regions, media header says {}",
        entries.len(),
        media.region_count()
    );
    for entry in &entries {
        verify_db_id(files, entry, opts)?;
    }
    verify_global_kdtree(files, &entries)?;
    for entry in &entries {
        let map_name = format!("{}1.SDL", entry.stem());
        if let Some(image) = files.get(&map_name) {
            verify_wayidx(&map_name, image, opts)?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ParcelRef {
    offset: u32,
    pid: u16,
}

/// Walks a file's parcels front to back, re-checking framing and CRC.
fn walk_linear(name: &str, image: &[u8], unit_size: u32) -> Result<Vec<ParcelRef>> {
    let unit = unit_size as usize;
    let mut parcels = Vec::new();
    let mut at = FILE_PREFIX_SIZE;
    ensure!(
        image.len() >= FILE_PREFIX_SIZE,
        "{} is shorter than its prefix",
        name
    );
    while at < image.len() {
        let hdr = PclHdr::from_bytes(&image[at..])?;
        ensure!(
            is_known_pid(hdr.pid()),
            "{} offset {}: unknown PID {:#06x}",
            name,
            at,
            hdr.pid()
        );
        ensure!(
            hdr.is_uncompressed(),
            "{} offset {}: compression flag missing",
            name,
            at
        );
        let payload_end = at + PCL_HEADER_SIZE + hdr.payload_len() as usize;
        ensure!(
            payload_end <= image.len(),
            "{} offset {}: payload runs past end of file",
            name,
            at
        );
        let payload = &image[at + PCL_HEADER_SIZE..payload_end];
        ensure!(
            payload_crc(payload) == hdr.crc32(),
            "{} offset {}: CRC mismatch",
            name,
            at
        );
        parcels.push(ParcelRef {
            offset: at as u32,
            pid: hdr.pid(),
        });
        let framed = PCL_HEADER_SIZE + hdr.payload_len() as usize;
        at += framed + (framed.wrapping_neg() & (unit - 1));
    }
    ensure!(
        at == image.len().max(FILE_PREFIX_SIZE),
        "{}: trailing bytes after last parcel",
        name
    );
    Ok(parcels)
}

/// Walks every PID chain from the region header and checks it visits each
/// parcel of its PID exactly once.
fn verify_chains(name: &str, image: &[u8], parcels: &[ParcelRef]) -> Result<()> {
    let hdr = RgnHdr::from_bytes(image)?;
    ensure!(
        hdr.pid_count() as usize == count_distinct_pids(parcels),
        "{}: PID table size disagrees with parcel contents",
        name
    );
    for entry in hdr.pid_entries() {
        let expected: Vec<u32> = parcels
            .iter()
            .filter(|p| p.pid == entry.pid())
            .map(|p| p.offset)
            .collect();
        ensure!(
            !expected.is_empty(),
            "{}: PID table lists {:#06x} but the file holds no such parcel",
            name,
            entry.pid()
        );

        let mut visited = Vec::new();
        let mut at = entry.first_offset();
        loop {
            ensure!(
                visited.len() <= expected.len(),
                "{}: PID {:#06x} chain does not terminate",
                name,
                entry.pid()
            );
            let pcl = PclHdr::from_bytes(&image[at as usize..])?;
            ensure!(
                pcl.pid() == entry.pid(),
                "{}: chain of PID {:#06x} reached a {:#06x} parcel",
                name,
                entry.pid(),
                pcl.pid()
            );
            visited.push(at);
            if pcl.next_offset() == END_OF_CHAIN {
                break;
            }
            at = pcl.next_offset();
        }
        ensure!(
            visited == expected,
            "{}: PID {:#06x} chain does not match the parcels in file order",
            name,
            entry.pid()
        );
    }
    Ok(())
}

fn count_distinct_pids(parcels: &[ParcelRef]) -> usize {
    let mut pids: Vec<u16> = parcels.iter().map(|p| p.pid).collect();
    pids.sort_unstable();
    pids.dedup();
    pids.len()
}

fn directory_entries(
    files: &BTreeMap<String, Vec<u8>>,
    cartotop_ptr: u32,
) -> Result<Vec<RegionDirEntry>> {
    let image = files
        .get("CARTOTOP.SDL")
        .ok_or_else(|| eyre::eyre!("CARTOTOP.SDL missing from media set"))?;
    let at = cartotop_ptr as usize;
    let hdr = PclHdr::from_bytes(&image[at..])?;
    ensure!(
        hdr.pid() == PID_CARTOTOP,
        "media header points at a {:#06x} parcel, not the directory",
        hdr.pid()
    );
    let payload = &image[at + PCL_HEADER_SIZE..at + PCL_HEADER_SIZE + hdr.payload_len() as usize];
    ensure!(payload.len() >= 2, "directory payload has no entry count");
    let count = u16::from_le_bytes([payload[0], payload[1]]) as usize;
    ensure!(
        payload.len() == 2 + count * REGION_DIR_ENTRY_SIZE,
        "directory payload length disagrees with its entry count"
    );
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let base = 2 + i * REGION_DIR_ENTRY_SIZE;
        entries.push(*RegionDirEntry::from_bytes(&payload[base..])?);
    }
    Ok(entries)
}

/// Invariant 3: the directory db_id equals the id inside the map file's
/// first road parcel.
fn verify_db_id(
    files: &BTreeMap<String, Vec<u8>>,
    entry: &RegionDirEntry,
    opts: &BuildOptions,
) -> Result<()> {
    let map_name = format!("{}1.SDL", entry.stem());
    let image = files
        .get(&map_name)
        .ok_or_else(|| eyre::eyre!("directory references missing file {}", map_name))?;

    let nav_offset = first_nav_offset(image, opts)?;
    let hdr = PclHdr::from_bytes(&image[nav_offset as usize..])?;
    ensure!(
        hdr.payload_len() >= 2,
        "{}: first road parcel has no db_id field",
        map_name
    );
    let at = nav_offset as usize + PCL_HEADER_SIZE;
    let embedded = u16::from_le_bytes([image[at], image[at + 1]]) as u32;
    ensure!(
        embedded == entry.db_id(),
        "{}: embedded db_id {} != directory db_id {}",
        map_name,
        embedded,
        entry.db_id()
    );
    Ok(())
}

fn first_nav_offset(image: &[u8], opts: &BuildOptions) -> Result<u32> {
    if opts.format_mode == FormatMode::Sdal {
        let hdr = RgnHdr::from_bytes(image)?;
        return hdr
            .pid_offset(PID_NAV)
            .ok_or_else(|| eyre::eyre!("region header lists no road chain"));
    }
    for p in walk_linear("map file", image, opts.unit_size)? {
        if p.pid == PID_NAV {
            return Ok(p.offset);
        }
    }
    bail!("map file holds no road parcel");
}

/// Invariant 4 and leaf reference validity.
fn verify_global_kdtree(
    files: &BTreeMap<String, Vec<u8>>,
    entries: &[RegionDirEntry],
) -> Result<()> {
    let image = files
        .get("KDTREE.SDL")
        .ok_or_else(|| eyre::eyre!("KDTREE.SDL missing from media set"))?;
    let idx = IdxPclHdr::from_bytes(&image[FILE_PREFIX_SIZE..])?;
    let at = FILE_PREFIX_SIZE + PCL_HEADER_SIZE;
    let (_, records) = kdtree::parse_payload(&image[at..at + idx.hdr().payload_len() as usize])?;

    let leaf_boxes: Vec<Bbox> = records
        .iter()
        .filter(|r| r.is_leaf())
        .map(|r| r.bbox())
        .collect();
    let entry_boxes: Vec<Bbox> = entries.iter().map(|e| e.bbox()).collect();
    let leaf_union = geo::union(&leaf_boxes);
    ensure!(
        leaf_union == geo::union(&entry_boxes),
        "KD-tree leaf union does not cover the region boxes"
    );
    ensure!(
        leaf_union == Some(idx.bbox()),
        "index header bbox disagrees with its leaves"
    );

    for leaf in records.iter().filter(|r| r.is_leaf()) {
        let entry = entries
            .iter()
            .find(|e| e.region_id() == leaf.region_id() as u32)
            .ok_or_else(|| eyre::eyre!("KD leaf references unknown region {}", leaf.region_id()))?;
        let map_name = format!("{}1.SDL", entry.stem());
        let map = files
            .get(&map_name)
            .ok_or_else(|| eyre::eyre!("KD leaf references missing file {}", map_name))?;
        let target = PclHdr::from_bytes(&map[leaf.chain_offset() as usize..])?;
        ensure!(
            target.pid() == leaf.pid() && is_known_pid(target.pid()),
            "KD leaf for region {} points at a {:#06x} parcel",
            leaf.region_id(),
            target.pid()
        );
    }
    Ok(())
}

/// Invariant 5 plus value validity for the way index.
fn verify_wayidx(name: &str, image: &[u8], opts: &BuildOptions) -> Result<()> {
    let parcels = walk_linear(name, image, opts.unit_size)?;
    let Some(root) = parcels.iter().find(|p| p.pid == PID_WAYIDX) else {
        return Ok(());
    };
    verify_wayidx_node(name, image, root.offset, None, None)?;
    Ok(())
}

fn node_at(image: &[u8], offset: u32) -> Result<NodeView<'_>> {
    let hdr = PclHdr::from_bytes(&image[offset as usize..])?;
    ensure!(
        hdr.pid() == PID_WAYIDX,
        "way index child points at a {:#06x} parcel",
        hdr.pid()
    );
    let at = offset as usize + PCL_HEADER_SIZE;
    NodeView::parse(&image[at..at + hdr.payload_len() as usize])
}

fn verify_wayidx_node(
    name: &str,
    image: &[u8],
    offset: u32,
    lower: Option<u64>,
    upper: Option<u64>,
) -> Result<u64> {
    let node = node_at(image, offset)?;
    match node.kind {
        NODE_KIND_LEAF => {
            let mut prev: Option<u64> = None;
            for i in 0..node.count as usize {
                let (key, _file, value_offset) = node.leaf_entry(i);
                if let Some(p) = prev {
                    ensure!(p < key, "{}: leaf keys out of order", name);
                }
                if let Some(lo) = lower {
                    ensure!(key >= lo, "{}: leaf key below parent separator", name);
                }
                if let Some(hi) = upper {
                    ensure!(key < hi, "{}: leaf key at or above next separator", name);
                }
                let target = PclHdr::from_bytes(&image[value_offset as usize..])?;
                ensure!(
                    target.pid() == PID_NAV,
                    "{}: way {} maps to a {:#06x} parcel",
                    name,
                    key,
                    target.pid()
                );
                prev = Some(key);
            }
            Ok(node.leaf_entry(0).0)
        }
        NODE_KIND_INTERNAL => {
            for i in 1..node.count as usize {
                ensure!(
                    node.key(i - 1) < node.key(i),
                    "{}: internal keys not strictly increasing",
                    name
                );
            }
            let mut first_key = None;
            for i in 0..=node.count as usize {
                let child_lower = if i == 0 { lower } else { Some(node.key(i - 1)) };
                let child_upper = if i == node.count as usize {
                    upper
                } else {
                    Some(node.key(i))
                };
                let child_first =
                    verify_wayidx_node(name, image, node.child(i), child_lower, child_upper)?;
                if i > 0 {
                    ensure!(
                        child_first == node.key(i - 1),
                        "{}: separator is not its child's first key",
                        name
                    );
                }
                if first_key.is_none() {
                    first_key = Some(child_first);
                }
            }
            Ok(first_key.expect("internal nodes have at least one child"))
        }
        other => bail!("{}: unknown way index node kind {}", name, other),
    }
}

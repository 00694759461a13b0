//! # Build Configuration Constants
//!
//! This module centralizes the configuration constants of the SDAL builder,
//! grouping interdependent values together and documenting their
//! relationships. Constants that depend on each other are co-located to
//! prevent mismatch bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_UNIT_SIZE (2048 bytes)
//!       │
//!       ├─> FILE_PREFIX_SIZE (512, RgnHdr_t / media header / OEM header)
//!       │     Every .SDL file starts with a 512-byte prefix; the first
//!       │     parcel therefore always sits at byte offset 512.
//!       │
//!       └─> SIZE_CLASS values are expressed in units, so one size-class
//!           byte covers payloads up to 255 * unit_size.
//!
//! DEFAULT_PARCEL_THRESHOLD (64 KiB)
//!       │
//!       └─> Bounds per-PID buffer memory; with at most MAX_ACTIVE_PIDS
//!           open buffers per region, streaming memory stays under
//!           MAX_ACTIVE_PIDS * DEFAULT_PARCEL_THRESHOLD.
//!
//! BTREE_FANOUT (64)
//!       │
//!       └─> BTREE_LEAF_FILL (48) = 3/4 fan-out; bulk-loaded leaves leave
//!           headroom for later insertions on extended archives.
//!
//! DEFAULT_SPILL_THRESHOLD (10_000_000 entries)
//!       │
//!       └─> Above this count the way-id triples sort runs over a
//!           memory-mapped temporary file instead of a Vec.
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions below:
//!
//! 1. `DEFAULT_UNIT_SIZE` is a power of two (padding uses mask arithmetic)
//! 2. `FILE_PREFIX_SIZE == 512` (fixed by the on-disc format)
//! 3. `BTREE_LEAF_FILL <= BTREE_FANOUT`

/// Alignment granularity for parcels inside a region file, in bytes.
pub const DEFAULT_UNIT_SIZE: u32 = 2048;

/// Fixed size of every file prefix: `RgnHdr_t`, `GlbMediaHeader_t`, and the
/// baked OEM control header are all exactly this long.
pub const FILE_PREFIX_SIZE: usize = 512;

/// Payload bytes at which an open per-PID buffer is sealed into a parcel.
pub const DEFAULT_PARCEL_THRESHOLD: usize = 64 * 1024;

/// Upper bound on distinct PIDs open at once in one region.
pub const MAX_ACTIVE_PIDS: usize = 16;

/// Size-class table capacity per region; selecting a class beyond this
/// fails the build with `PayloadTooLarge`.
pub const MAX_SIZE_CLASSES: usize = 255;

/// B+-tree fan-out: keys per internal node, entries per full leaf.
pub const BTREE_FANOUT: usize = 64;

/// Bulk-load fill factor for leaves (3/4 of fan-out).
pub const BTREE_LEAF_FILL: usize = 48;

/// Way-id triple count above which the sorter spills to a mapped temp file.
pub const DEFAULT_SPILL_THRESHOLD: usize = 10_000_000;

/// End-of-chain marker for `PclHdr_t::next_offset` and B+-tree leaf links.
pub const END_OF_CHAIN: u32 = 0xFFFF_FFFF;

/// Granularity of the absolute anchor point in road records, in
/// micro-degrees per anchor unit. The anchor is the only coordinate stored
/// absolutely in an i24 field; 100 µ° units cover the full ±180° range.
pub const ANCHOR_UNIT_MICRODEG: i32 = 100;

const _: () = assert!(DEFAULT_UNIT_SIZE.is_power_of_two());
const _: () = assert!(FILE_PREFIX_SIZE == 512);
const _: () = assert!(BTREE_LEAF_FILL <= BTREE_FANOUT);
const _: () = assert!(MAX_SIZE_CLASSES <= u8::MAX as usize);

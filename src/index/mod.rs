//! # Index Builders
//!
//! Indexes are built after a region's data parcels are sealed, over the
//! metadata the encoders recorded (parcel bounding boxes and way-id
//! triples). Offsets stored in index structures always point at parcel
//! headers.
//!
//! - `spill`: way-triple collection with mmap-backed external sort
//! - `wayidx`: the `PID_WAYIDX` B+-tree keyed by OSM way id
//! - `kdtree`: the two-level spatial KD-tree parcels

pub mod kdtree;
pub mod spill;
pub mod wayidx;

pub use kdtree::{KdItem, KdNodeRec};
pub use spill::{SortedTriples, TripleSorter, WayTriple};

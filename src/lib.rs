//! # osm2sdal - OSM to SDAL/PSF v1.7 Archive Builder
//!
//! osm2sdal converts OpenStreetMap extracts into legacy automotive
//! navigation map archives in the SDAL Parcel Storage Format v1.7, packaged
//! inside an ISO 9660 image for vintage in-dash DVD units. The firmware on
//! those units enforces strict binary layout, fixed 512-byte headers,
//! parcel chaining, per-parcel CRC-32, and spatial/id indexing; this crate
//! produces byte-exact images that satisfy all of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        CLI wrapper (bin)            │
//! ├─────────────────────────────────────┤
//! │   Build orchestration (build)       │
//! ├──────────────────┬──────────────────┤
//! │ Region assembly  │  Media assembly  │
//! ├──────────────────┴──────────────────┤
//! │ Indexes (KD-tree, way B+-tree)      │
//! ├─────────────────────────────────────┤
//! │ Record encoders (roads/names/POI/   │
//! │ density)                            │
//! ├─────────────────────────────────────┤
//! │ Format layer (headers, framing,     │
//! │ CRC)                                │
//! ├─────────────────────────────────────┤
//! │ ISO 9660 writer                     │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Archive Layout
//!
//! ```text
//! /INIT.SDL        media header + baked locale tables
//! /CARTOTOP.SDL    global region directory
//! /KDTREE.SDL      global KD-tree over region boxes
//! /REGIONS.SDL     region name table        (OEM mode only)
//! /MTOC.SDL        media table of contents  (OEM mode only)
//! /<stem>0.SDL     per-region metadata: names, POIs, regional KD-tree
//! /<stem>1.SDL     per-region map parcels and way index
//! /DENS<rr>0.SDL   density tile directory
//! /DENS<rr>1.SDL   density raw tiles
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use osm2sdal::{build_iso, BuildOptions, RegionInput, VecSource};
//!
//! let mut source = VecSource::terminated(records);
//! let mut regions = [RegionInput {
//!     slug: "europe/cyprus".into(),
//!     source: &mut source,
//! }];
//! build_iso(&mut regions, &BuildOptions::default(), "out.iso".as_ref())?;
//! ```
//!
//! ## Module Overview
//!
//! - [`format`]: on-disc headers, CRC, parcel framing
//! - [`encode`]: per-family record encoders
//! - [`index`]: spatial KD-tree and way-id B+-tree builders
//! - [`assemble`]: region and media assembly
//! - [`iso`]: ISO 9660 level-1 writer
//! - [`build`]: pipeline orchestration, options, cancellation
//! - [`verify`]: post-build structural verification
//! - [`osm`]: pbf-backed record source used by the CLI

#[macro_use]
mod macros;

pub mod assemble;
pub mod build;
pub mod config;
pub mod encode;
pub mod error;
pub mod format;
pub mod geo;
pub mod index;
pub mod iso;
pub mod osm;
pub mod records;
pub mod verify;

pub use build::{build_iso, build_media_files, BuildOptions, CancelToken, FormatMode, RegionInput};
pub use error::BuildError;
pub use records::{DensityTile, Poi, Point, Record, RecordSource, Road, VecSource};

//! # Archive Assembly
//!
//! Region and media assembly: turning sealed parcel areas into finished
//! `.SDL` file images and the global control files.
//!
//! - `region`: per-region build loop and region file finishing
//! - `media`: `INIT.SDL`, `CARTOTOP.SDL`, `KDTREE.SDL`, OEM tables
//! - `baked`: immutable OEM constants (control header, locale dictionary)
//! - `oem`: OEM-only `REGIONS.SDL` / `MTOC.SDL` table encoders

pub mod baked;
pub mod media;
pub mod oem;
pub mod region;

pub use media::assemble_media;
pub use region::{build_region, RegionOutput, RegionSpec};

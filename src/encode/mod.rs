//! # Record Encoders
//!
//! One sub-encoder per parcel family. Each consumes normalized records,
//! fills an in-memory payload buffer, and seals it into the owning
//! [`ParcelArea`](crate::format::ParcelArea) when the configured threshold
//! is reached:
//!
//! - `roads`: `PID_NAV` road records, KD-tree and B+-tree feed
//! - `names`: `PID_POINAMES` deduplicated string table
//! - `poi`: `PID_POIGEOM` fixed-size POI geometry records
//! - `density`: `PID_DENS0`/`PID_DENS1` tile directory and raw tiles

pub mod density;
pub mod names;
pub mod poi;
pub mod roads;

pub use density::DensityEncoder;
pub use names::NameTable;
pub use poi::PoiEncoder;
pub use roads::{RoadEncoder, RoadParcelMeta, FILE_MAP, FILE_META};

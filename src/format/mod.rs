//! # On-Disc Format Layer
//!
//! Everything that touches raw archive bytes lives here:
//!
//! - `crc`: payload CRC-32 and unit padding helpers
//! - `headers`: fixed zerocopy header structs (`PclHdr`, `IdxPclHdr`,
//!   `RgnHdr`, `GlbMediaHeader`, `RegionDirEntry`) and the PID constants
//! - `parcel`: the append-only parcel framer with chain back-patching
//!
//! Higher layers (encoders, indexes, assemblers) never write header bytes
//! by hand; they go through these types so layout and endianness stay in
//! one place.

pub mod crc;
pub mod headers;
pub mod parcel;

pub use crc::{pad_to, payload_crc};
pub use headers::{
    bbox_prefix, is_known_pid, GlbMediaHeader, IdxPclHdr, PclHdr, PidEntry, RegionDirEntry,
    RgnHdr, FLAG_NO_COMPRESSION, GLB_MAGIC, IDX_PCL_HEADER_SIZE, KNOWN_PIDS, PCL_HEADER_SIZE,
    PID_CARTOTOP, PID_DENS0, PID_DENS1, PID_KDTREE, PID_LOCALE, PID_NAV, PID_POIGEOM,
    PID_POINAMES, PID_WAYIDX, PSF_VERSION_MAJOR, PSF_VERSION_MINOR, REGION_DIR_ENTRY_SIZE,
    UCA_PARCEL_SIZES_LEN,
};
pub use parcel::ParcelArea;

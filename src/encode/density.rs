//! # Density Overlay Encoder
//!
//! Density rasters are written as two parallel parcel families across two
//! files: `PID_DENS1` carries the raw tile bytes, `PID_DENS0` carries the
//! tile directory mapping packed tile keys to byte ranges inside the logical
//! family-1 stream.
//!
//! ## Directory Payload
//!
//! ```text
//! count    u32
//! entries  count x { key u32, offset u32, len u32 }
//! ```
//!
//! `key` packs `(zoom, x, y)` as `zoom << 28 | x << 14 | y`. `offset` and
//! `len` describe the tile inside the concatenated raw stream, which runs
//! across parcel boundaries exactly like the name table. A zero-byte tile
//! is a legal entry with `len == 0`.

use eyre::Result;

use crate::format::headers::{PID_DENS0, PID_DENS1};
use crate::format::ParcelArea;
use crate::records::DensityTile;

pub const DIR_ENTRY_SIZE: usize = 12;

#[derive(Debug, Clone, Copy)]
struct DirEntry {
    key: u32,
    offset: u32,
    len: u32,
}

pub struct DensityEncoder {
    threshold: usize,
    raw_buf: Vec<u8>,
    raw_logical_len: u32,
    entries: Vec<DirEntry>,
}

impl DensityEncoder {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            raw_buf: Vec::new(),
            raw_logical_len: 0,
            entries: Vec::new(),
        }
    }

    /// Appends one tile: raw bytes into the family-1 stream, one directory
    /// entry for family 0.
    pub fn push(&mut self, tile: &DensityTile, raw_area: &mut ParcelArea) -> Result<()> {
        if !self.raw_buf.is_empty() && self.raw_buf.len() + tile.bytes.len() > self.threshold {
            raw_area.seal(PID_DENS1, &self.raw_buf)?;
            self.raw_buf.clear();
        }
        self.entries.push(DirEntry {
            key: tile.key(),
            offset: self.raw_logical_len,
            len: tile.bytes.len() as u32,
        });
        self.raw_buf.extend_from_slice(&tile.bytes);
        self.raw_logical_len += tile.bytes.len() as u32;
        Ok(())
    }

    /// Seals the raw tail and writes the directory parcels. Returns the
    /// number of tiles indexed.
    pub fn finish(
        self,
        dir_area: &mut ParcelArea,
        raw_area: &mut ParcelArea,
    ) -> Result<usize> {
        if !self.raw_buf.is_empty() {
            raw_area.seal(PID_DENS1, &self.raw_buf)?;
        }
        if self.entries.is_empty() {
            return Ok(0);
        }

        // The directory itself honors the parcel threshold; each directory
        // parcel restates its own entry count.
        let per_parcel = ((self.threshold.saturating_sub(4)) / DIR_ENTRY_SIZE).max(1);
        for chunk in self.entries.chunks(per_parcel) {
            let mut payload = Vec::with_capacity(4 + chunk.len() * DIR_ENTRY_SIZE);
            payload.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
            for e in chunk {
                payload.extend_from_slice(&e.key.to_le_bytes());
                payload.extend_from_slice(&e.offset.to_le_bytes());
                payload.extend_from_slice(&e.len.to_le_bytes());
            }
            dir_area.seal(PID_DENS0, &payload)?;
        }
        Ok(self.entries.len())
    }
}

//! # Name Table Encoder
//!
//! Builds the region's `PID_POINAMES` string table: length-prefixed UTF-8
//! strings packed back-to-back. Road and POI records reference strings by
//! logical byte offset into the table stream; the stream continues across
//! parcel boundaries, so references stay stable no matter how the table is
//! split into parcels.
//!
//! Strings are deduplicated by exact byte equality through a running hash
//! map: interning the same name twice returns the same reference and writes
//! nothing.

use eyre::{ensure, Result};
use hashbrown::HashMap;

use crate::format::headers::PID_POINAMES;
use crate::format::ParcelArea;

pub struct NameTable {
    threshold: usize,
    refs: HashMap<Box<[u8]>, u32>,
    buf: Vec<u8>,
    logical_len: u32,
}

impl NameTable {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            refs: HashMap::new(),
            buf: Vec::new(),
            logical_len: 0,
        }
    }

    /// Returns the table reference for `name`, adding it on first sight.
    pub fn intern(&mut self, name: &str, area: &mut ParcelArea) -> Result<u32> {
        if let Some(&offset) = self.refs.get(name.as_bytes()) {
            return Ok(offset);
        }

        let bytes = name.as_bytes();
        ensure!(
            bytes.len() <= u16::MAX as usize,
            "name of {} bytes exceeds the length prefix",
            bytes.len()
        );

        let entry_len = 2 + bytes.len();
        if !self.buf.is_empty() && self.buf.len() + entry_len > self.threshold {
            self.seal(area)?;
        }

        let offset = self.logical_len;
        self.buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(bytes);
        self.logical_len += entry_len as u32;
        self.refs.insert(bytes.into(), offset);
        Ok(offset)
    }

    fn seal(&mut self, area: &mut ParcelArea) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        area.seal(PID_POINAMES, &self.buf)?;
        self.buf.clear();
        Ok(())
    }

    /// Seals the open tail of the table.
    pub fn finish(mut self, area: &mut ParcelArea) -> Result<()> {
        self.seal(area)
    }

    /// Total logical table length so far, in bytes.
    pub fn logical_len(&self) -> u32 {
        self.logical_len
    }
}

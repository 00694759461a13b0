//! # Parcel Framing
//!
//! [`ParcelArea`] owns the byte image of one `.SDL` file while it is being
//! built: a 512-byte prefix reservation followed by framed parcels. Sealing
//! a payload into the area:
//!
//! 1. computes the payload CRC,
//! 2. picks the smallest size class that fits (growing the region's class
//!    table when needed, failing with `PayloadTooLarge` once its 255 entries
//!    are exhausted),
//! 3. back-patches the previous parcel of the same PID so the chain's
//!    `next_offset` links point forward,
//! 4. appends header + payload and pads the pair to a unit multiple.
//!
//! Offsets handed back are file-relative. Because parcel lengths are always
//! unit multiples and the prefix is 512 bytes, every parcel lands at
//! `512 + k * unit_size`.
//!
//! The area is strictly append-only apart from the `next_offset`
//! back-patches; nothing here reorders parcels, which is what keeps builds
//! deterministic.

use eyre::Result;
use hashbrown::HashMap;
use zerocopy::IntoBytes;

use crate::config::{FILE_PREFIX_SIZE, MAX_SIZE_CLASSES};
use crate::error::BuildError;
use crate::format::crc::payload_crc;
use crate::format::headers::{PclHdr, PCL_HEADER_SIZE};

/// Byte image of one `.SDL` file under construction.
pub struct ParcelArea {
    buf: Vec<u8>,
    unit_size: u32,
    size_classes: Vec<u8>,
    chain_tails: HashMap<u16, usize>,
    first_offsets: Vec<(u16, u32)>,
}

impl ParcelArea {
    pub fn new(unit_size: u32) -> Self {
        debug_assert!(unit_size.is_power_of_two());
        Self {
            buf: vec![0u8; FILE_PREFIX_SIZE],
            unit_size,
            size_classes: Vec::new(),
            chain_tails: HashMap::new(),
            first_offsets: Vec::new(),
        }
    }

    /// File-relative offset the next sealed parcel will receive.
    pub fn next_parcel_offset(&self) -> u32 {
        self.buf.len() as u32
    }

    pub fn unit_size(&self) -> u32 {
        self.unit_size
    }

    /// Seals `payload` as a parcel of family `pid` and returns the offset of
    /// its header.
    pub fn seal(&mut self, pid: u16, payload: &[u8]) -> Result<u32> {
        if payload.len() as u64 > u32::MAX as u64 {
            return Err(BuildError::PayloadOverflow {
                len: payload.len() as u64,
            }
            .into());
        }

        let size_code = self.pick_size_code(payload.len())?;
        let crc = payload_crc(payload);
        let offset = self.buf.len();

        if let Some(&tail) = self.chain_tails.get(&pid) {
            let hdr = PclHdr::from_bytes_mut(&mut self.buf[tail..tail + PCL_HEADER_SIZE])?;
            hdr.set_next_offset(offset as u32);
        } else {
            self.first_offsets.push((pid, offset as u32));
        }
        self.chain_tails.insert(pid, offset);

        let hdr = PclHdr::new(pid, size_code, payload.len() as u32, crc);
        self.buf.extend_from_slice(hdr.as_bytes());
        self.buf.extend_from_slice(payload);

        let parcel_len = self.buf.len() - offset;
        let pad = parcel_len.wrapping_neg() & (self.unit_size as usize - 1);
        self.buf.resize(self.buf.len() + pad, 0);

        Ok(offset as u32)
    }

    /// Smallest size-class index whose class (in units) fits the payload;
    /// appends a new class when none does.
    fn pick_size_code(&mut self, payload_len: usize) -> Result<u8> {
        let unit = self.unit_size as usize;
        let needed_units = payload_len.div_ceil(unit).max(1);

        if let Some(code) = self
            .size_classes
            .iter()
            .position(|&c| c as usize >= needed_units)
        {
            return Ok(code as u8);
        }

        if needed_units > u8::MAX as usize || self.size_classes.len() >= MAX_SIZE_CLASSES {
            return Err(BuildError::PayloadTooLarge {
                len: payload_len,
                classes: self.size_classes.len(),
            }
            .into());
        }

        self.size_classes.push(needed_units as u8);
        Ok((self.size_classes.len() - 1) as u8)
    }

    /// PIDs present, in the order their chains start in the file, with the
    /// offset of each chain's first parcel.
    pub fn first_offsets(&self) -> &[(u16, u32)] {
        &self.first_offsets
    }

    pub fn size_classes(&self) -> &[u8] {
        &self.size_classes
    }

    pub fn is_empty(&self) -> bool {
        self.first_offsets.is_empty()
    }

    /// Writes the 512-byte prefix and returns the finished file image.
    pub fn finish(mut self, prefix: &[u8; FILE_PREFIX_SIZE]) -> Vec<u8> {
        self.buf[..FILE_PREFIX_SIZE].copy_from_slice(prefix);
        self.buf
    }

    /// Size code a sealed parcel was framed with.
    pub fn size_code_at(&self, offset: u32) -> Result<u8> {
        Ok(PclHdr::from_bytes(&self.buf[offset as usize..])?.size_code())
    }

    /// Read access to an already sealed parcel header.
    #[cfg(test)]
    fn header_at(&self, offset: u32) -> Result<&PclHdr> {
        PclHdr::from_bytes(&self.buf[offset as usize..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_UNIT_SIZE, END_OF_CHAIN};
    use crate::format::headers::PID_NAV;

    #[test]
    fn first_parcel_lands_after_the_prefix() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let offset = area.seal(PID_NAV, b"payload").unwrap();
        assert_eq!(offset, 512);
        assert_eq!(area.first_offsets(), &[(PID_NAV, 512)]);
    }

    #[test]
    fn parcels_are_padded_to_unit_multiples() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        area.seal(PID_NAV, &[0xAB; 29]).unwrap();
        let second = area.seal(PID_NAV, &[0xCD; 10]).unwrap();
        assert_eq!(second, 512 + 2048);
    }

    #[test]
    fn chain_backpatching_links_same_pid_parcels() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let first = area.seal(PID_NAV, b"one").unwrap();
        let second = area.seal(PID_NAV, b"two").unwrap();
        let third = area.seal(PID_NAV, b"three").unwrap();

        assert_eq!(area.header_at(first).unwrap().next_offset(), second);
        assert_eq!(area.header_at(second).unwrap().next_offset(), third);
        assert_eq!(area.header_at(third).unwrap().next_offset(), END_OF_CHAIN);
    }

    #[test]
    fn chains_of_different_pids_stay_separate() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let nav = area.seal(PID_NAV, b"roads").unwrap();
        area.seal(0x20, b"names").unwrap();
        let nav2 = area.seal(PID_NAV, b"more roads").unwrap();

        assert_eq!(area.header_at(nav).unwrap().next_offset(), nav2);
        assert_eq!(area.first_offsets().len(), 2);
    }

    #[test]
    fn header_declares_exact_payload_len_and_crc() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let offset = area.seal(PID_NAV, &[0xAB; 29]).unwrap();
        let hdr = area.header_at(offset).unwrap();
        assert_eq!(hdr.payload_len(), 29);
        assert_eq!(hdr.crc32(), payload_crc(&[0xAB; 29]));
        assert!(hdr.is_uncompressed());
    }

    #[test]
    fn size_classes_grow_on_demand_and_are_reused() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        area.seal(PID_NAV, &[0; 100]).unwrap();
        area.seal(PID_NAV, &[0; 5000]).unwrap();
        area.seal(PID_NAV, &[0; 90]).unwrap();

        // 100 B -> 1 unit, 5000 B -> 3 units, 90 B reuses class 0.
        assert_eq!(area.size_classes(), &[1, 3]);
    }

    #[test]
    fn oversized_payload_fails_with_payload_too_large() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        // 255 units is the largest representable class.
        let too_big = vec![0u8; 256 * DEFAULT_UNIT_SIZE as usize];
        let err = area.seal(PID_NAV, &too_big).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn finish_installs_the_prefix() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        area.seal(PID_NAV, b"x").unwrap();
        let prefix = [0x5A_u8; FILE_PREFIX_SIZE];
        let image = area.finish(&prefix);
        assert_eq!(&image[..FILE_PREFIX_SIZE], &prefix[..]);
        assert_eq!(image.len(), 512 + 2048);
    }
}

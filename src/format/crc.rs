//! # Payload CRC and Padding
//!
//! Every parcel payload is protected by a CRC-32 using the reflected
//! IEEE 802.3 polynomial (`0xEDB88320`, init `0xFFFFFFFF`, final XOR
//! `0xFFFFFFFF`). The `crc` crate's `CRC_32_ISO_HDLC` algorithm is exactly
//! this configuration.
//!
//! The CRC covers the payload after encoding and before padding; padding
//! bytes are always zero and are never part of the checksum.

use crc::{Crc, CRC_32_ISO_HDLC};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-32 of a parcel payload.
#[inline]
pub fn payload_crc(payload: &[u8]) -> u32 {
    CRC32.checksum(payload)
}

/// Appends zero bytes until `buf.len()` is a multiple of `align`.
///
/// `align` must be a power of two.
pub fn pad_to(buf: &mut Vec<u8>, align: usize) {
    debug_assert!(align.is_power_of_two());
    let pad = buf.len().wrapping_neg() & (align - 1);
    buf.resize(buf.len() + pad, 0);
}

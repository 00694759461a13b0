//! # On-Disc Header Definitions
//!
//! Type-safe, zerocopy-based header structs for the SDAL/PSF v1.7 archive.
//! Every multi-byte field is little-endian; every struct size is pinned by a
//! compile-time assertion.
//!
//! ## Header Inventory
//!
//! 1. **`PclHdr`** (16 bytes) - frames every parcel. Declares the parcel
//!    family (PID), payload length, payload CRC, and the file-relative
//!    offset of the next parcel in the same PID chain.
//!
//! 2. **`IdxPclHdr`** (32 bytes) - the view over an index parcel's start:
//!    a `PclHdr` followed by the 16-byte bounding box that prefixes every
//!    index payload. The bbox bytes belong to the payload, so `payload_len`
//!    and `crc32` cover them.
//!
//! 3. **`RgnHdr`** (512 bytes) - leads every region file in SDAL mode.
//!    Carries the region identity, unit size, bounding box, the sparse
//!    PID-to-first-parcel table, the size-class table, and the per-PID
//!    default size codes.
//!
//! 4. **`GlbMediaHeader`** (512 bytes) - leads `INIT.SDL`. Magic `"SDAL"`,
//!    format version 1.7, caller-supplied creation timestamp, language
//!    fields, the pointer to the region directory parcel, and the global
//!    per-PID size table.
//!
//! 5. **`RegionDirEntry`** (64 bytes) - one row of the `CARTOTOP.SDL`
//!    directory parcel. Its `db_id` must equal the id embedded in the
//!    referenced region's first road parcel; the firmware verifies exactly
//!    this cross-link.
//!
//! ## Offsets
//!
//! All parcel offsets stored anywhere - PID tables, chains, index leaves,
//! B+-tree values - are relative to the start of the enclosing file. Every
//! file begins with a 512-byte prefix, so offset 0 never addresses a parcel
//! and doubles as the "empty entry" marker in the PID table.
//!
//! ## Endianness
//!
//! The zerocopy `U16`/`U32`/`U64`/`I32` little-endian wrappers handle all
//! byte-order conversion; accessors are generated with
//! `zerocopy_accessors!`.

use eyre::{ensure, Result};
use zerocopy::little_endian::{I32, U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{END_OF_CHAIN, FILE_PREFIX_SIZE, MAX_ACTIVE_PIDS, MAX_SIZE_CLASSES};
use crate::geo::Bbox;

pub const PCL_HEADER_SIZE: usize = 16;
pub const IDX_PCL_HEADER_SIZE: usize = 32;
pub const REGION_DIR_ENTRY_SIZE: usize = 64;

pub const GLB_MAGIC: &[u8; 4] = b"SDAL";
pub const PSF_VERSION_MAJOR: u16 = 1;
pub const PSF_VERSION_MINOR: u16 = 7;

/// Payload flag bit 0: parcel payload is stored uncompressed. Always set in
/// this profile; the remaining bits are reserved for compression schemes.
pub const FLAG_NO_COMPRESSION: u8 = 0x01;

pub const PID_NAV: u16 = 0x10;
pub const PID_POINAMES: u16 = 0x20;
pub const PID_POIGEOM: u16 = 0x21;
pub const PID_DENS0: u16 = 0x30;
pub const PID_DENS1: u16 = 0x31;
pub const PID_CARTOTOP: u16 = 0x40;
pub const PID_WAYIDX: u16 = 0x50;
pub const PID_LOCALE: u16 = 0x60;
pub const PID_KDTREE: u16 = 0x70;

/// Per-PID default size-code table length; covers the defined PID range.
pub const UCA_PARCEL_SIZES_LEN: usize = 96;

/// Every PID this profile emits.
pub const KNOWN_PIDS: [u16; 9] = [
    PID_NAV,
    PID_POINAMES,
    PID_POIGEOM,
    PID_DENS0,
    PID_DENS1,
    PID_CARTOTOP,
    PID_WAYIDX,
    PID_LOCALE,
    PID_KDTREE,
];

#[inline]
pub fn is_known_pid(pid: u16) -> bool {
    KNOWN_PIDS.contains(&pid)
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PclHdr {
    pid: U16,
    flags: u8,
    size_code: u8,
    payload_len: U32,
    crc32: U32,
    next_offset: U32,
}

const _: () = assert!(std::mem::size_of::<PclHdr>() == PCL_HEADER_SIZE);

impl PclHdr {
    pub fn new(pid: u16, size_code: u8, payload_len: u32, crc32: u32) -> Self {
        Self {
            pid: U16::new(pid),
            flags: FLAG_NO_COMPRESSION,
            size_code,
            payload_len: U32::new(payload_len),
            crc32: U32::new(crc32),
            next_offset: U32::new(END_OF_CHAIN),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= PCL_HEADER_SIZE,
            "buffer too small for PclHdr: {} < {}",
            bytes.len(),
            PCL_HEADER_SIZE
        );
        Self::ref_from_bytes(&bytes[..PCL_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse PclHdr: {:?}", e))
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= PCL_HEADER_SIZE,
            "buffer too small for PclHdr: {} < {}",
            bytes.len(),
            PCL_HEADER_SIZE
        );
        Self::mut_from_bytes(&mut bytes[..PCL_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse PclHdr: {:?}", e))
    }

    zerocopy_accessors! {
        pid: u16,
        payload_len: u32,
        crc32: u32,
        next_offset: u32,
    }

    #[inline]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    #[inline]
    pub fn size_code(&self) -> u8 {
        self.size_code
    }

    #[inline]
    pub fn is_uncompressed(&self) -> bool {
        self.flags & FLAG_NO_COMPRESSION != 0
    }

    #[inline]
    pub fn ends_chain(&self) -> bool {
        self.next_offset.get() == END_OF_CHAIN
    }
}

/// Header view over an index parcel: `PclHdr` plus the 16-byte bounding-box
/// payload prefix.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct IdxPclHdr {
    hdr: PclHdr,
    min_lat: I32,
    min_lon: I32,
    max_lat: I32,
    max_lon: I32,
}

const _: () = assert!(std::mem::size_of::<IdxPclHdr>() == IDX_PCL_HEADER_SIZE);

impl IdxPclHdr {
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= IDX_PCL_HEADER_SIZE,
            "buffer too small for IdxPclHdr: {} < {}",
            bytes.len(),
            IDX_PCL_HEADER_SIZE
        );
        Self::ref_from_bytes(&bytes[..IDX_PCL_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse IdxPclHdr: {:?}", e))
    }

    pub fn hdr(&self) -> &PclHdr {
        &self.hdr
    }

    pub fn bbox(&self) -> Bbox {
        Bbox {
            min_lat: self.min_lat.get(),
            min_lon: self.min_lon.get(),
            max_lat: self.max_lat.get(),
            max_lon: self.max_lon.get(),
        }
    }
}

/// Serializes a bounding box as the 16-byte index payload prefix.
pub fn bbox_prefix(bbox: &Bbox) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(&bbox.min_lat.to_le_bytes());
    out[4..8].copy_from_slice(&bbox.min_lon.to_le_bytes());
    out[8..12].copy_from_slice(&bbox.max_lat.to_le_bytes());
    out[12..16].copy_from_slice(&bbox.max_lon.to_le_bytes());
    out
}

/// One row of the sparse PID table in `RgnHdr`. All-zero entries are empty;
/// a real entry can never be all-zero because no parcel lives at offset 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PidEntry {
    pid: U16,
    reserved: [u8; 2],
    first_offset: U32,
}

const _: () = assert!(std::mem::size_of::<PidEntry>() == 8);

impl PidEntry {
    pub fn new(pid: u16, first_offset: u32) -> Self {
        Self {
            pid: U16::new(pid),
            reserved: [0; 2],
            first_offset: U32::new(first_offset),
        }
    }

    zerocopy_getters! {
        pid: u16,
        first_offset: u32,
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first_offset.get() == 0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RgnHdr {
    region_id: U32,
    region_code: [u8; 2],
    pid_count: u8,
    size_class_count: u8,
    unit_size: U32,
    min_lat: I32,
    min_lon: I32,
    max_lat: I32,
    max_lon: I32,
    reserved: [u8; 4],
    pid_table: [PidEntry; MAX_ACTIVE_PIDS],
    size_classes: [u8; 256],
    uca_parcel_sizes: [u8; UCA_PARCEL_SIZES_LEN],
}

const _: () = assert!(std::mem::size_of::<RgnHdr>() == FILE_PREFIX_SIZE);

impl RgnHdr {
    pub fn new(region_id: u32, region_code: [u8; 2], unit_size: u32) -> Self {
        Self {
            region_id: U32::new(region_id),
            region_code,
            pid_count: 0,
            size_class_count: 0,
            unit_size: U32::new(unit_size),
            min_lat: I32::new(0),
            min_lon: I32::new(0),
            max_lat: I32::new(0),
            max_lon: I32::new(0),
            reserved: [0; 4],
            pid_table: [PidEntry::new(0, 0); MAX_ACTIVE_PIDS],
            size_classes: [0; 256],
            uca_parcel_sizes: [0; UCA_PARCEL_SIZES_LEN],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_PREFIX_SIZE,
            "buffer too small for RgnHdr: {} < {}",
            bytes.len(),
            FILE_PREFIX_SIZE
        );
        Self::ref_from_bytes(&bytes[..FILE_PREFIX_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse RgnHdr: {:?}", e))
    }

    zerocopy_accessors! {
        region_id: u32,
        unit_size: u32,
    }

    #[inline]
    pub fn region_code(&self) -> [u8; 2] {
        self.region_code
    }

    #[inline]
    pub fn pid_count(&self) -> u8 {
        self.pid_count
    }

    #[inline]
    pub fn size_class_count(&self) -> u8 {
        self.size_class_count
    }

    pub fn bbox(&self) -> Bbox {
        Bbox {
            min_lat: self.min_lat.get(),
            min_lon: self.min_lon.get(),
            max_lat: self.max_lat.get(),
            max_lon: self.max_lon.get(),
        }
    }

    pub fn set_bbox(&mut self, bbox: &Bbox) {
        self.min_lat = I32::new(bbox.min_lat);
        self.min_lon = I32::new(bbox.min_lon);
        self.max_lat = I32::new(bbox.max_lat);
        self.max_lon = I32::new(bbox.max_lon);
    }

    /// Fills the sparse PID table. Entries must already be in the order the
    /// chains appear in the file; the count is capped by the table size.
    pub fn set_pid_table(&mut self, entries: &[(u16, u32)]) -> Result<()> {
        ensure!(
            entries.len() <= MAX_ACTIVE_PIDS,
            "{} PIDs exceed the {}-entry region table",
            entries.len(),
            MAX_ACTIVE_PIDS
        );
        for (slot, &(pid, offset)) in self.pid_table.iter_mut().zip(entries) {
            *slot = PidEntry::new(pid, offset);
        }
        self.pid_count = entries.len() as u8;
        Ok(())
    }

    /// First-parcel offset of a PID chain, if the PID is present.
    pub fn pid_offset(&self, pid: u16) -> Option<u32> {
        self.pid_table[..self.pid_count as usize]
            .iter()
            .find(|e| e.pid() == pid && !e.is_empty())
            .map(|e| e.first_offset())
    }

    pub fn pid_entries(&self) -> &[PidEntry] {
        &self.pid_table[..self.pid_count as usize]
    }

    /// Installs the size-class table (values in units).
    pub fn set_size_classes(&mut self, classes: &[u8]) -> Result<()> {
        ensure!(
            classes.len() <= MAX_SIZE_CLASSES,
            "{} size classes exceed the table capacity {}",
            classes.len(),
            MAX_SIZE_CLASSES
        );
        self.size_classes[..classes.len()].copy_from_slice(classes);
        self.size_class_count = classes.len() as u8;
        Ok(())
    }

    /// Payload class of a size code, in units.
    pub fn size_class(&self, code: u8) -> Option<u8> {
        if (code as usize) < self.size_class_count as usize {
            Some(self.size_classes[code as usize])
        } else {
            None
        }
    }

    pub fn uca_parcel_sizes(&self) -> &[u8; UCA_PARCEL_SIZES_LEN] {
        &self.uca_parcel_sizes
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct GlbMediaHeader {
    magic: [u8; 4],
    version_major: U16,
    version_minor: U16,
    creation_time: U64,
    region_count: U16,
    language: [u8; 3],
    pad: u8,
    supp_languages: [u8; 32],
    cartotop_ptr: U32,
    uca_parcel_sizes: [u8; 256],
    reserved: [u8; 198],
}

const _: () = assert!(std::mem::size_of::<GlbMediaHeader>() == FILE_PREFIX_SIZE);

impl GlbMediaHeader {
    pub fn new(creation_time: u64, region_count: u16, language: [u8; 3]) -> Self {
        Self {
            magic: *GLB_MAGIC,
            version_major: U16::new(PSF_VERSION_MAJOR),
            version_minor: U16::new(PSF_VERSION_MINOR),
            creation_time: U64::new(creation_time),
            region_count: U16::new(region_count),
            language,
            pad: 0,
            supp_languages: [0; 32],
            cartotop_ptr: U32::new(0),
            uca_parcel_sizes: [0; 256],
            reserved: [0; 198],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= FILE_PREFIX_SIZE,
            "buffer too small for GlbMediaHeader: {} < {}",
            bytes.len(),
            FILE_PREFIX_SIZE
        );
        let header = Self::ref_from_bytes(&bytes[..FILE_PREFIX_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse GlbMediaHeader: {:?}", e))?;
        ensure!(&header.magic == GLB_MAGIC, "invalid magic in media header");
        ensure!(
            header.version_major.get() == PSF_VERSION_MAJOR
                && header.version_minor.get() == PSF_VERSION_MINOR,
            "unsupported PSF version {}.{} (expected {}.{})",
            header.version_major.get(),
            header.version_minor.get(),
            PSF_VERSION_MAJOR,
            PSF_VERSION_MINOR,
        );
        Ok(header)
    }

    zerocopy_accessors! {
        creation_time: u64,
        cartotop_ptr: u32,
    }

    zerocopy_getters! {
        version_major: u16,
        version_minor: u16,
        region_count: u16,
    }

    #[inline]
    pub fn magic(&self) -> &[u8; 4] {
        &self.magic
    }

    #[inline]
    pub fn language(&self) -> &[u8; 3] {
        &self.language
    }

    /// Comma-separated supplementary languages, truncated to the field.
    pub fn set_supp_languages(&mut self, csv: &str) {
        let bytes = csv.as_bytes();
        let n = bytes.len().min(self.supp_languages.len());
        self.supp_languages = [0; 32];
        self.supp_languages[..n].copy_from_slice(&bytes[..n]);
    }

    pub fn supp_languages(&self) -> &[u8; 32] {
        &self.supp_languages
    }

    pub fn set_uca_parcel_sizes(&mut self, table: &[u8; 256]) {
        self.uca_parcel_sizes = *table;
    }

    pub fn uca_parcel_sizes(&self) -> &[u8; 256] {
        &self.uca_parcel_sizes
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RegionDirEntry {
    region_id: U32,
    stem: [u8; 8],
    min_lat: I32,
    min_lon: I32,
    max_lat: I32,
    max_lon: I32,
    db_id: U32,
    reserved: [u8; 32],
}

const _: () = assert!(std::mem::size_of::<RegionDirEntry>() == REGION_DIR_ENTRY_SIZE);

impl RegionDirEntry {
    pub fn new(region_id: u32, stem: &str, bbox: &Bbox, db_id: u32) -> Self {
        let mut stem_field = [0u8; 8];
        let bytes = stem.as_bytes();
        let n = bytes.len().min(8);
        stem_field[..n].copy_from_slice(&bytes[..n]);
        Self {
            region_id: U32::new(region_id),
            stem: stem_field,
            min_lat: I32::new(bbox.min_lat),
            min_lon: I32::new(bbox.min_lon),
            max_lat: I32::new(bbox.max_lat),
            max_lon: I32::new(bbox.max_lon),
            db_id: U32::new(db_id),
            reserved: [0; 32],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= REGION_DIR_ENTRY_SIZE,
            "buffer too small for RegionDirEntry: {} < {}",
            bytes.len(),
            REGION_DIR_ENTRY_SIZE
        );
        Self::ref_from_bytes(&bytes[..REGION_DIR_ENTRY_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse RegionDirEntry: {:?}", e))
    }

    zerocopy_getters! {
        region_id: u32,
        db_id: u32,
    }

    /// Filename stem with trailing NULs stripped.
    pub fn stem(&self) -> &str {
        let end = self.stem.iter().position(|&b| b == 0).unwrap_or(8);
        std::str::from_utf8(&self.stem[..end]).unwrap_or("")
    }

    pub fn bbox(&self) -> Bbox {
        Bbox {
            min_lat: self.min_lat.get(),
            min_lon: self.min_lon.get(),
            max_lat: self.max_lat.get(),
            max_lon: self.max_lon.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;

    #[test]
    fn pcl_header_size_is_16() {
        assert_eq!(std::mem::size_of::<PclHdr>(), 16);
    }

    #[test]
    fn region_header_size_is_512() {
        assert_eq!(std::mem::size_of::<RgnHdr>(), 512);
    }

    #[test]
    fn media_header_size_is_512() {
        assert_eq!(std::mem::size_of::<GlbMediaHeader>(), 512);
    }

    #[test]
    fn pcl_header_roundtrip() {
        let mut hdr = PclHdr::new(PID_NAV, 3, 29, 0xDEAD_BEEF);
        hdr.set_next_offset(2560);

        let bytes = hdr.as_bytes().to_vec();
        let parsed = PclHdr::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.pid(), PID_NAV);
        assert_eq!(parsed.size_code(), 3);
        assert_eq!(parsed.payload_len(), 29);
        assert_eq!(parsed.crc32(), 0xDEAD_BEEF);
        assert_eq!(parsed.next_offset(), 2560);
        assert!(parsed.is_uncompressed());
        assert!(!parsed.ends_chain());
    }

    #[test]
    fn pcl_header_layout_is_little_endian() {
        let hdr = PclHdr::new(0x0110, 0, 0x0403_0201, 0);
        let bytes = hdr.as_bytes();
        assert_eq!(&bytes[0..2], &[0x10, 0x01]);
        assert_eq!(bytes[2], FLAG_NO_COMPRESSION);
        assert_eq!(&bytes[4..8], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[12..16], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn fresh_parcel_ends_its_chain() {
        assert!(PclHdr::new(PID_NAV, 0, 0, 0).ends_chain());
    }

    #[test]
    fn region_header_pid_lookup() {
        let mut hdr = RgnHdr::new(1, *b"CY", 2048);
        hdr.set_pid_table(&[(PID_NAV, 512), (PID_WAYIDX, 4608)]).unwrap();

        assert_eq!(hdr.pid_count(), 2);
        assert_eq!(hdr.pid_offset(PID_NAV), Some(512));
        assert_eq!(hdr.pid_offset(PID_WAYIDX), Some(4608));
        assert_eq!(hdr.pid_offset(PID_DENS0), None);
    }

    #[test]
    fn region_header_rejects_too_many_pids() {
        let mut hdr = RgnHdr::new(1, *b"CY", 2048);
        let entries: Vec<(u16, u32)> = (0..17).map(|i| (i as u16, 512 + i * 2048)).collect();
        assert!(hdr.set_pid_table(&entries).is_err());
    }

    #[test]
    fn region_header_size_classes() {
        let mut hdr = RgnHdr::new(1, *b"CY", 2048);
        hdr.set_size_classes(&[1, 2, 4, 32]).unwrap();

        assert_eq!(hdr.size_class_count(), 4);
        assert_eq!(hdr.size_class(2), Some(4));
        assert_eq!(hdr.size_class(4), None);
    }

    #[test]
    fn region_header_roundtrip_through_bytes() {
        let mut hdr = RgnHdr::new(7, *b"MT", 2048);
        hdr.set_bbox(&Bbox {
            min_lat: 35_800_000,
            min_lon: 14_100_000,
            max_lat: 36_100_000,
            max_lon: 14_600_000,
        });
        hdr.set_pid_table(&[(PID_NAV, 512)]).unwrap();

        let bytes = hdr.as_bytes().to_vec();
        let parsed = RgnHdr::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.region_id(), 7);
        assert_eq!(parsed.region_code(), *b"MT");
        assert_eq!(parsed.unit_size(), 2048);
        assert_eq!(parsed.bbox().min_lat, 35_800_000);
        assert_eq!(parsed.pid_offset(PID_NAV), Some(512));
    }

    #[test]
    fn media_header_rejects_bad_magic() {
        let mut bytes = [0u8; 512];
        bytes[..4].copy_from_slice(b"NOPE");
        assert!(GlbMediaHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn media_header_rejects_wrong_version() {
        let mut hdr = GlbMediaHeader::new(0, 1, *b"UKE");
        hdr.version_minor = U16::new(8);
        let bytes = hdr.as_bytes().to_vec();
        assert!(GlbMediaHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn media_header_roundtrip() {
        let mut hdr = GlbMediaHeader::new(946_684_800, 2, *b"UKE");
        hdr.set_supp_languages("DAN,DUT");
        hdr.set_cartotop_ptr(512);

        let bytes = hdr.as_bytes().to_vec();
        let parsed = GlbMediaHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.magic(), GLB_MAGIC);
        assert_eq!(parsed.version_major(), 1);
        assert_eq!(parsed.version_minor(), 7);
        assert_eq!(parsed.creation_time(), 946_684_800);
        assert_eq!(parsed.region_count(), 2);
        assert_eq!(parsed.cartotop_ptr(), 512);
        assert_eq!(&parsed.supp_languages()[..7], b"DAN,DUT");
    }

    #[test]
    fn region_dir_entry_roundtrip() {
        let bbox = Bbox {
            min_lat: 34_500_000,
            min_lon: 32_200_000,
            max_lat: 35_700_000,
            max_lon: 34_600_000,
        };
        let entry = RegionDirEntry::new(1, "CYP", &bbox, 1);
        let bytes = entry.as_bytes().to_vec();
        let parsed = RegionDirEntry::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.region_id(), 1);
        assert_eq!(parsed.stem(), "CYP");
        assert_eq!(parsed.db_id(), 1);
        assert_eq!(parsed.bbox(), bbox);
    }

    #[test]
    fn idx_header_exposes_bbox_prefix() {
        let bbox = Bbox {
            min_lat: 1,
            min_lon: 2,
            max_lat: 3,
            max_lon: 4,
        };
        let mut bytes = Vec::new();
        bytes.extend_from_slice(PclHdr::new(PID_KDTREE, 0, 16, 0).as_bytes());
        bytes.extend_from_slice(&bbox_prefix(&bbox));

        let idx = IdxPclHdr::from_bytes(&bytes).unwrap();
        assert_eq!(idx.hdr().pid(), PID_KDTREE);
        assert_eq!(idx.bbox(), bbox);
    }
}

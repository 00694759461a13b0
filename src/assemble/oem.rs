//! # OEM-Only Table Files
//!
//! `REGIONS.SDL` and `MTOC.SDL` reproduce the table layouts of original OEM
//! discs and are emitted only in OEM mode. They are plain baked tables, not
//! parcel streams: no `PclHdr_t` framing, no chains.
//!
//! ## REGIONS.SDL
//!
//! OEM header (16 bytes), then one row per region of ten 16-byte NUL-padded
//! name cells: the native name followed by its translations, unused cells
//! zeroed. Padded to a unit multiple.
//!
//! ## MTOC.SDL
//!
//! A 64-byte zero header, then one 64-byte record per file on the disc:
//! the 8.3 name at offset 8, the file-class marker byte at offset 24, and a
//! running file id at offset 28. Padded to a unit multiple.

use crate::assemble::baked;
use crate::format::pad_to;

const OEM_TABLE_HEADER: usize = 16;
const REGION_CELL: usize = 16;
const REGION_ROW_CELLS: usize = 10;
const MTOC_RECORD: usize = 64;

pub fn encode_regions_table(slugs: &[String], supp_langs: &[String], unit_size: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"SDAL");
    buf.resize(OEM_TABLE_HEADER, 0);

    for slug in slugs {
        let row = baked::region_row(slug, supp_langs);
        for cell in row.iter().take(REGION_ROW_CELLS) {
            let bytes = cell.as_bytes();
            let n = bytes.len().min(REGION_CELL);
            buf.extend_from_slice(&bytes[..n]);
            buf.resize(buf.len() + (REGION_CELL - n), 0);
        }
        for _ in row.len()..REGION_ROW_CELLS {
            buf.resize(buf.len() + REGION_CELL, 0);
        }
    }

    pad_to(&mut buf, unit_size as usize);
    buf
}

pub fn encode_mtoc(file_names: &[String], unit_size: u32) -> Vec<u8> {
    let mut buf = vec![0u8; MTOC_RECORD];

    for (i, name) in file_names.iter().enumerate() {
        let mut rec = [0u8; MTOC_RECORD];
        let upper = name.to_ascii_uppercase();
        let bytes = upper.as_bytes();
        let n = bytes.len().min(16);
        rec[8..8 + n].copy_from_slice(&bytes[..n]);
        rec[24] = baked::marker_for_file(&upper);
        rec[28..32].copy_from_slice(&((i + 1) as u32).to_le_bytes());
        buf.extend_from_slice(&rec);
    }

    pad_to(&mut buf, unit_size as usize);
    buf
}

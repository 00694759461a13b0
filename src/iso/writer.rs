//! # ISO 9660 Level-1 Writer
//!
//! Serializes a set of named byte buffers into a conformant ISO 9660
//! interchange-level-1 image: 2048-byte logical sectors, a Primary Volume
//! Descriptor at sector 16 (see ECMA-119 8.4), a set terminator, type-L and
//! type-M path tables, and a single root directory of 8.3 uppercase names
//! with `;1` version suffixes.
//!
//! ## Layout
//!
//! ```text
//! sectors  0..16   system area (zero)
//! sector   16      Primary Volume Descriptor ("CD001")
//! sector   17      Volume Descriptor Set Terminator
//! sector   18      type-L path table (little-endian)
//! sector   19      type-M path table (big-endian)
//! sectors  20..    root directory records
//! sectors  ...     file extents, each sector-aligned, in name order
//! ```
//!
//! Directory records never straddle a sector boundary; a record that would
//! cross is pushed to the next sector, as the specification requires.
//!
//! ## Atomicity
//!
//! `write_to` serializes into a temporary file in the destination directory
//! and renames it over the target, so a failed build never leaves a partial
//! image behind.
//!
//! All timestamps derive from the caller-supplied creation time, keeping
//! image bytes reproducible.

use std::path::Path;

use eyre::{bail, ensure, Result, WrapErr};

pub const SECTOR_SIZE: usize = 2048;

const PVD_SECTOR: u32 = 16;
const DIR_RECORD_FIXED: usize = 33;

pub struct IsoWriter {
    volume_id: String,
    timestamp: u64,
    files: Vec<(String, Vec<u8>)>,
}

impl IsoWriter {
    pub fn new(volume_id: &str, timestamp: u64) -> Self {
        Self {
            volume_id: volume_id.to_string(),
            timestamp,
            files: Vec::new(),
        }
    }

    /// Registers a file. Names must be unique 8.3 uppercase.
    pub fn add_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        validate_name(name)?;
        ensure!(
            !self.files.iter().any(|(n, _)| n == name),
            "duplicate file name {:?} in ISO",
            name
        );
        self.files.push((name.to_string(), bytes));
        Ok(())
    }

    /// Serializes the image. Files appear in name order regardless of the
    /// order they were added.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut files: Vec<&(String, Vec<u8>)> = self.files.iter().collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));

        // Root directory layout: self + parent records, then one per file.
        // Records are laid out sector by sector to find the directory size.
        let mut dir_len = DIR_RECORD_FIXED + 1 + (DIR_RECORD_FIXED + 1);
        for (name, _) in &files {
            let rec = dir_record_len(name);
            let room = SECTOR_SIZE - dir_len % SECTOR_SIZE;
            if rec > room {
                dir_len += room;
            }
            dir_len += rec;
        }
        let dir_sectors = dir_len.div_ceil(SECTOR_SIZE).max(1) as u32;

        let root_dir_sector: u32 = PVD_SECTOR + 4;
        let mut next_extent = root_dir_sector + dir_sectors;

        let mut extents = Vec::with_capacity(files.len());
        for (_, bytes) in &files {
            extents.push(next_extent);
            next_extent += (bytes.len().div_ceil(SECTOR_SIZE)).max(1) as u32;
        }
        let total_sectors = next_extent;

        let mut image = vec![0u8; total_sectors as usize * SECTOR_SIZE];

        self.write_pvd(
            &mut image,
            total_sectors,
            root_dir_sector,
            dir_sectors * SECTOR_SIZE as u32,
        );
        write_terminator(&mut image);
        write_path_tables(&mut image, root_dir_sector);
        self.write_root_dir(&mut image, root_dir_sector, dir_sectors, &files, &extents);

        for ((_, bytes), &extent) in files.iter().zip(&extents) {
            let at = extent as usize * SECTOR_SIZE;
            image[at..at + bytes.len()].copy_from_slice(bytes);
        }

        Ok(image)
    }

    /// Writes the image atomically: temp file in the target directory, then
    /// rename. On error nothing is left behind.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .wrap_err_with(|| format!("failed to create temp ISO in {}", dir.display()))?;
        std::io::Write::write_all(&mut tmp, &bytes)
            .wrap_err("failed to write ISO image bytes")?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .wrap_err_with(|| format!("failed to move ISO into place at {}", path.display()))?;
        Ok(())
    }

    fn write_pvd(&self, image: &mut [u8], total_sectors: u32, root_sector: u32, root_len: u32) {
        let base = PVD_SECTOR as usize * SECTOR_SIZE;
        let pvd = &mut image[base..base + SECTOR_SIZE];

        pvd[0] = 1;
        pvd[1..6].copy_from_slice(b"CD001");
        pvd[6] = 1;
        fill_a_chars(&mut pvd[8..40], "OSM2SDAL");
        fill_a_chars(&mut pvd[40..72], &self.volume_id);
        both_endian_u32(&mut pvd[80..88], total_sectors);
        both_endian_u16(&mut pvd[120..124], 1);
        both_endian_u16(&mut pvd[124..128], 1);
        both_endian_u16(&mut pvd[128..132], SECTOR_SIZE as u16);
        both_endian_u32(&mut pvd[132..140], PATH_TABLE_LEN as u32);
        pvd[140..144].copy_from_slice(&(PVD_SECTOR + 2).to_le_bytes());
        pvd[148..152].copy_from_slice(&(PVD_SECTOR + 3).to_be_bytes());

        let root_rec = dir_record(b"\0", root_sector, root_len, self.timestamp, true);
        pvd[156..156 + root_rec.len()].copy_from_slice(&root_rec);

        fill_a_chars(&mut pvd[190..318], "");
        fill_a_chars(&mut pvd[318..446], "OSM2SDAL");
        fill_a_chars(&mut pvd[446..574], "OSM2SDAL");
        fill_a_chars(&mut pvd[574..702], "OSM2SDAL");
        fill_a_chars(&mut pvd[702..739], "");
        fill_a_chars(&mut pvd[739..776], "");
        fill_a_chars(&mut pvd[776..813], "");
        long_date(&mut pvd[813..830], self.timestamp);
        long_date(&mut pvd[830..847], self.timestamp);
        fill_a_chars(&mut pvd[847..864], "0000000000000000");
        pvd[863] = 0;
        fill_a_chars(&mut pvd[864..881], "0000000000000000");
        pvd[880] = 0;
        pvd[881] = 1;
    }

    fn write_root_dir(
        &self,
        image: &mut [u8],
        root_sector: u32,
        dir_sectors: u32,
        files: &[&(String, Vec<u8>)],
        extents: &[u32],
    ) {
        let root_len = dir_sectors * SECTOR_SIZE as u32;
        let base = root_sector as usize * SECTOR_SIZE;
        let mut at = base;

        for id in [&b"\0"[..], &b"\x01"[..]] {
            let rec = dir_record(id, root_sector, root_len, self.timestamp, true);
            image[at..at + rec.len()].copy_from_slice(&rec);
            at += rec.len();
        }

        for ((name, bytes), &extent) in files.iter().zip(extents) {
            let id = format!("{};1", name);
            let rec = dir_record(id.as_bytes(), extent, bytes.len() as u32, self.timestamp, false);
            let room = SECTOR_SIZE - (at - base) % SECTOR_SIZE;
            if rec.len() > room {
                at += room;
            }
            image[at..at + rec.len()].copy_from_slice(&rec);
            at += rec.len();
        }
    }
}

const PATH_TABLE_LEN: usize = 10;

fn write_terminator(image: &mut [u8]) {
    let base = (PVD_SECTOR as usize + 1) * SECTOR_SIZE;
    image[base] = 255;
    image[base + 1..base + 6].copy_from_slice(b"CD001");
    image[base + 6] = 1;
}

fn write_path_tables(image: &mut [u8], root_sector: u32) {
    // Single root entry: id length 1, extended attr 0, extent, parent 1,
    // identifier 0x00, pad to even.
    let l_base = (PVD_SECTOR as usize + 2) * SECTOR_SIZE;
    image[l_base] = 1;
    image[l_base + 2..l_base + 6].copy_from_slice(&root_sector.to_le_bytes());
    image[l_base + 6..l_base + 8].copy_from_slice(&1u16.to_le_bytes());

    let m_base = (PVD_SECTOR as usize + 3) * SECTOR_SIZE;
    image[m_base] = 1;
    image[m_base + 2..m_base + 6].copy_from_slice(&root_sector.to_be_bytes());
    image[m_base + 6..m_base + 8].copy_from_slice(&1u16.to_be_bytes());
}

fn dir_record_len(name: &str) -> usize {
    let id_len = name.len() + 2; // ";1"
    let mut len = DIR_RECORD_FIXED + id_len;
    if len % 2 == 1 {
        len += 1;
    }
    len
}

fn dir_record(id: &[u8], extent: u32, data_len: u32, timestamp: u64, is_dir: bool) -> Vec<u8> {
    let mut len = DIR_RECORD_FIXED + id.len();
    if len % 2 == 1 {
        len += 1;
    }
    let mut rec = vec![0u8; len];
    rec[0] = len as u8;
    both_endian_u32(&mut rec[2..10], extent);
    both_endian_u32(&mut rec[10..18], data_len);
    short_date(&mut rec[18..25], timestamp);
    rec[25] = if is_dir { 0x02 } else { 0x00 };
    both_endian_u16(&mut rec[28..32], 1);
    rec[32] = id.len() as u8;
    rec[33..33 + id.len()].copy_from_slice(id);
    rec
}

fn validate_name(name: &str) -> Result<()> {
    let Some((base, ext)) = name.split_once('.') else {
        bail!("ISO file name {:?} has no extension", name);
    };
    ensure!(
        !base.is_empty() && base.len() <= 8 && ext.len() <= 3,
        "ISO file name {:?} violates 8.3",
        name
    );
    for c in base.chars().chain(ext.chars()) {
        ensure!(
            c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_',
            "ISO file name {:?} contains invalid character {:?}",
            name,
            c
        );
    }
    Ok(())
}

fn both_endian_u16(out: &mut [u8], v: u16) {
    out[0..2].copy_from_slice(&v.to_le_bytes());
    out[2..4].copy_from_slice(&v.to_be_bytes());
}

fn both_endian_u32(out: &mut [u8], v: u32) {
    out[0..4].copy_from_slice(&v.to_le_bytes());
    out[4..8].copy_from_slice(&v.to_be_bytes());
}

fn fill_a_chars(out: &mut [u8], text: &str) {
    out.fill(b' ');
    let bytes = text.as_bytes();
    let n = bytes.len().min(out.len());
    out[..n].copy_from_slice(&bytes[..n]);
}

/// 7-byte directory-record date.
fn short_date(out: &mut [u8], timestamp: u64) {
    let (y, mo, d, h, mi, s) = civil_from_unix(timestamp);
    out[0] = y.saturating_sub(1900).min(255) as u8;
    out[1] = mo;
    out[2] = d;
    out[3] = h;
    out[4] = mi;
    out[5] = s;
    out[6] = 0;
}

/// 17-byte volume-descriptor date: "YYYYMMDDHHMMSScc" + GMT offset.
fn long_date(out: &mut [u8], timestamp: u64) {
    let (y, mo, d, h, mi, s) = civil_from_unix(timestamp);
    let text = format!("{:04}{:02}{:02}{:02}{:02}{:02}00", y.min(9999), mo, d, h, mi, s);
    out[..16].copy_from_slice(text.as_bytes());
    out[16] = 0;
}

/// Unix seconds to civil UTC date.
fn civil_from_unix(timestamp: u64) -> (u16, u8, u8, u8, u8, u8) {
    let days = (timestamp / 86_400) as i64;
    let secs = timestamp % 86_400;

    // Days-to-civil conversion over 400-year eras.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    (
        y as u16,
        m as u8,
        d as u8,
        (secs / 3600) as u8,
        (secs % 3600 / 60) as u8,
        (secs % 60) as u8,
    )
}

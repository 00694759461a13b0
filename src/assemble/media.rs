//! # Media Assembler
//!
//! Composes the global files after every region is sealed:
//!
//! - `INIT.SDL`: `GlbMediaHeader_t` prefix + the baked locale parcel
//! - `CARTOTOP.SDL`: the region directory parcel
//! - `KDTREE.SDL`: the global KD-tree over region bounding boxes
//! - `REGIONS.SDL` / `MTOC.SDL`: OEM-mode table files
//!
//! `INIT.SDL` keeps its media-header prefix in both modes; the other global
//! files carry a pseudo-region `RgnHdr_t` in SDAL mode and the baked OEM
//! control header in OEM mode, exactly like region files.

use std::collections::BTreeMap;

use eyre::{ensure, Result};
use zerocopy::IntoBytes;

use crate::assemble::baked;
use crate::assemble::oem;
use crate::assemble::region::RegionOutput;
use crate::build::{BuildOptions, FormatMode};
use crate::format::headers::{PID_CARTOTOP, PID_KDTREE, PID_LOCALE, PID_NAV};
use crate::format::{GlbMediaHeader, ParcelArea, RegionDirEntry, RgnHdr};
use crate::geo::{self, Bbox};
use crate::index::{kdtree, KdItem};

pub fn assemble_media(
    regions: &[RegionOutput],
    opts: &BuildOptions,
) -> Result<BTreeMap<String, Vec<u8>>> {
    ensure!(!regions.is_empty(), "media assembly needs at least one region");

    let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for region in regions {
        for (name, bytes) in &region.files {
            files.insert(name.clone(), bytes.clone());
        }
    }

    let region_boxes: Vec<Bbox> = regions.iter().map(|r| r.bbox).collect();
    let global_bbox = geo::union(&region_boxes).expect("regions are non-empty");

    // Region directory.
    let mut carto_area = ParcelArea::new(opts.unit_size);
    let mut dir_payload = Vec::new();
    dir_payload.extend_from_slice(&(regions.len() as u16).to_le_bytes());
    for region in regions {
        let entry = RegionDirEntry::new(
            region.spec.region_id,
            &region.spec.stem,
            &region.bbox,
            region.spec.db_id as u32,
        );
        dir_payload.extend_from_slice(entry.as_bytes());
    }
    let cartotop_ptr = carto_area.seal(PID_CARTOTOP, &dir_payload)?;
    files.insert(
        "CARTOTOP.SDL".to_string(),
        finish_global_file(carto_area, *b"GL", &global_bbox, opts)?,
    );

    // Global KD-tree over region boxes; leaves reference each region's road
    // chain inside its map file.
    let mut kd_area = ParcelArea::new(opts.unit_size);
    let kd_items: Vec<KdItem> = regions
        .iter()
        .map(|r| KdItem {
            bbox: r.bbox,
            region_id: r.spec.region_id as u16,
            pid: PID_NAV,
            chain_offset: r.nav_first_offset,
        })
        .collect();
    kdtree::seal_parcel(PID_KDTREE, &kd_items, &mut kd_area)?;
    files.insert(
        "KDTREE.SDL".to_string(),
        finish_global_file(kd_area, *b"GK", &global_bbox, opts)?,
    );

    // INIT.SDL: media header + baked locale tables.
    let supp_langs = parse_supp_langs(&opts.supp_langs);
    let mut init_area = ParcelArea::new(opts.unit_size);
    init_area.seal(PID_LOCALE, &baked::encode_locale_table(&supp_langs))?;

    let mut media_hdr = GlbMediaHeader::new(opts.creation_time, regions.len() as u16, opts.language);
    media_hdr.set_supp_languages(&opts.supp_langs);
    media_hdr.set_cartotop_ptr(cartotop_ptr);
    media_hdr.set_uca_parcel_sizes(&global_size_table(regions));
    let mut prefix = [0u8; 512];
    prefix.copy_from_slice(media_hdr.as_bytes());
    files.insert("INIT.SDL".to_string(), init_area.finish(&prefix));

    if opts.format_mode == FormatMode::Oem {
        let slugs: Vec<String> = regions.iter().map(|r| r.spec.slug.clone()).collect();
        files.insert(
            "REGIONS.SDL".to_string(),
            oem::encode_regions_table(&slugs, &supp_langs, opts.unit_size),
        );
        let listed: Vec<String> = files.keys().cloned().collect();
        files.insert(
            "MTOC.SDL".to_string(),
            oem::encode_mtoc(&listed, opts.unit_size),
        );
    }

    Ok(files)
}

/// Global per-PID size table: assembled last, after all regions are sealed.
/// The profile keeps every default at 0; regions whose parcels use other
/// classes carry the true code in each `PclHdr_t`.
fn global_size_table(_regions: &[RegionOutput]) -> [u8; 256] {
    [0u8; 256]
}

fn parse_supp_langs(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn finish_global_file(
    area: ParcelArea,
    code: [u8; 2],
    bbox: &Bbox,
    opts: &BuildOptions,
) -> Result<Vec<u8>> {
    let prefix: [u8; 512] = match opts.format_mode {
        FormatMode::Sdal => {
            let mut hdr = RgnHdr::new(0, code, area.unit_size());
            hdr.set_bbox(bbox);
            hdr.set_pid_table(area.first_offsets())?;
            hdr.set_size_classes(area.size_classes())?;
            let mut bytes = [0u8; 512];
            bytes.copy_from_slice(hdr.as_bytes());
            bytes
        }
        FormatMode::Oem => baked::oem_control_header(),
    };
    Ok(area.finish(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supp_lang_csv_is_normalized() {
        assert_eq!(parse_supp_langs("dan, dut"), vec!["DAN", "DUT"]);
        assert!(parse_supp_langs("").is_empty());
        assert_eq!(parse_supp_langs("UKE,,"), vec!["UKE"]);
    }
}

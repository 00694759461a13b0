//! # Region Assembler
//!
//! Drives one region's record stream through the per-family encoders,
//! builds the region's indexes over the sealed parcels, and finishes the
//! region files:
//!
//! - `<stem>1.SDL`: road parcels (`PID_NAV`) followed by the way-id B+-tree
//!   (`PID_WAYIDX`)
//! - `<stem>0.SDL`: name table, POI geometry, and the regional KD parcel
//! - `DENS<rr>0.SDL` / `DENS<rr>1.SDL`: density directory and raw tiles,
//!   emitted only when the stream carried tiles
//!
//! The region bounding box is the union of the road parcels' boxes; a
//! region with no road parcels fails with `BboxInvalid`. The stream must
//! terminate with `End`; running dry is `InputExhausted`.

use eyre::{ensure, Result};
use zerocopy::IntoBytes;

use crate::build::{BuildOptions, FormatMode};
use crate::encode::{DensityEncoder, NameTable, PoiEncoder, RoadEncoder};
use crate::error::BuildError;
use crate::format::headers::{PID_KDTREE, PID_NAV};
use crate::format::{ParcelArea, RgnHdr};
use crate::geo::{self, Bbox};
use crate::index::{kdtree, wayidx, KdItem, TripleSorter};
use crate::records::{Record, RecordSource};

/// Identity of one region being built.
#[derive(Debug, Clone)]
pub struct RegionSpec {
    pub slug: String,
    pub stem: String,
    pub code: [u8; 2],
    pub region_id: u32,
    pub db_id: u16,
}

impl RegionSpec {
    /// Derives the file identity from a Geofabrik-style slug; regions are
    /// numbered in input order starting at 1.
    pub fn from_slug(slug: &str, index: usize) -> Result<Self> {
        let name = slug.split('/').next_back().unwrap_or(slug);
        let stem: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_ascii_uppercase();
        ensure!(!stem.is_empty(), "region slug {:?} has no usable name", slug);

        let mut code = [b'X'; 2];
        for (i, b) in stem.bytes().take(2).enumerate() {
            code[i] = b;
        }
        Ok(Self {
            slug: slug.to_string(),
            stem,
            code,
            region_id: (index + 1) as u32,
            db_id: (index + 1) as u16,
        })
    }
}

/// A finished region: its files and the metadata the media assembler needs.
pub struct RegionOutput {
    pub spec: RegionSpec,
    pub bbox: Bbox,
    /// Offset of the first `PID_NAV` parcel inside the map file.
    pub nav_first_offset: u32,
    pub files: Vec<(String, Vec<u8>)>,
}

pub fn build_region(
    spec: RegionSpec,
    source: &mut dyn RecordSource,
    opts: &BuildOptions,
) -> Result<RegionOutput> {
    let unit = opts.unit_size;
    let mut map_area = ParcelArea::new(unit);
    let mut meta_area = ParcelArea::new(unit);
    let mut dens_dir_area = ParcelArea::new(unit);
    let mut dens_raw_area = ParcelArea::new(unit);

    let mut roads = RoadEncoder::new(spec.db_id, opts.parcel_threshold);
    let mut names = NameTable::new(opts.parcel_threshold);
    let mut pois = PoiEncoder::new(opts.parcel_threshold);
    let mut density = DensityEncoder::new(opts.parcel_threshold);

    let mut saw_end = false;
    while let Some(record) = source.next_record()? {
        if opts.cancel.is_cancelled() {
            return Err(BuildError::Cancelled.into());
        }
        match record {
            Record::Road(road) => {
                let name_ref = names.intern(&road.name, &mut meta_area)?;
                roads.push(&road, name_ref, &mut map_area)?;
            }
            Record::Poi(poi) => {
                let name_ref = names.intern(&poi.name, &mut meta_area)?;
                pois.push(&poi, name_ref, &mut meta_area)?;
            }
            Record::DensityTile(tile) => {
                density.push(&tile, &mut dens_raw_area)?;
            }
            Record::End => {
                saw_end = true;
                break;
            }
        }
    }
    if !saw_end {
        return Err(BuildError::InputExhausted.into());
    }

    let (parcel_meta, triples) = roads.finish(&mut map_area)?;
    names.finish(&mut meta_area)?;
    let poi_count = pois.finish(&mut meta_area)?;
    let tile_count = density.finish(&mut dens_dir_area, &mut dens_raw_area)?;

    let boxes: Vec<Bbox> = parcel_meta.iter().map(|m| m.bbox).collect();
    let bbox = geo::union(&boxes).ok_or_else(|| BuildError::BboxInvalid {
        region: spec.slug.clone(),
    })?;
    let nav_first_offset = parcel_meta[0].offset;

    let mut sorter = TripleSorter::new(opts.spill_threshold);
    sorter.extend(triples)?;
    let sorted = sorter.finish()?;
    wayidx::build(sorted.as_slice(), &mut map_area)?;

    let kd_items: Vec<KdItem> = parcel_meta
        .iter()
        .map(|m| KdItem {
            bbox: m.bbox,
            region_id: spec.region_id as u16,
            pid: PID_NAV,
            chain_offset: m.offset,
        })
        .collect();
    kdtree::seal_parcel(PID_KDTREE, &kd_items, &mut meta_area)?;

    log::info!(
        "region {}: {} road parcels, {} ways, {} POIs, {} density tiles",
        spec.slug,
        parcel_meta.len(),
        sorted.len(),
        poi_count,
        tile_count,
    );

    let mut files = Vec::new();
    files.push((
        format!("{}1.SDL", spec.stem),
        finish_region_file(map_area, &spec, &bbox, opts)?,
    ));
    files.push((
        format!("{}0.SDL", spec.stem),
        finish_region_file(meta_area, &spec, &bbox, opts)?,
    ));
    if tile_count > 0 {
        let rr = std::str::from_utf8(&spec.code).unwrap_or("XX").to_string();
        files.push((
            format!("DENS{}0.SDL", rr),
            finish_region_file(dens_dir_area, &spec, &bbox, opts)?,
        ));
        files.push((
            format!("DENS{}1.SDL", rr),
            finish_region_file(dens_raw_area, &spec, &bbox, opts)?,
        ));
    }

    Ok(RegionOutput {
        spec,
        bbox,
        nav_first_offset,
        files,
    })
}

/// Builds the 512-byte prefix for a finished area and returns the file
/// image. The payload bytes are identical in both modes; only the prefix
/// differs.
pub fn finish_region_file(
    area: ParcelArea,
    spec: &RegionSpec,
    bbox: &Bbox,
    opts: &BuildOptions,
) -> Result<Vec<u8>> {
    let mut hdr = RgnHdr::new(spec.region_id, spec.code, area.unit_size());
    hdr.set_bbox(bbox);
    hdr.set_pid_table(area.first_offsets())?;
    hdr.set_size_classes(area.size_classes())?;

    // The per-PID default table stays all-zero; parcels framed with a
    // different class keep their true code in PclHdr_t.
    for &(pid, offset) in area.first_offsets() {
        let code = area.size_code_at(offset)?;
        if code != 0 {
            log::warn!(
                "PID {:#04x} in {} opens with size class {}; per-PID table defaults to 0",
                pid,
                spec.slug,
                code
            );
        }
    }

    let prefix: [u8; 512] = match opts.format_mode {
        FormatMode::Sdal => {
            let mut bytes = [0u8; 512];
            bytes.copy_from_slice(hdr.as_bytes());
            bytes
        }
        FormatMode::Oem => crate::assemble::baked::oem_control_header(),
    };
    Ok(area.finish(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_from_slug_derives_stem_and_code() {
        let spec = RegionSpec::from_slug("europe/cyprus", 0).unwrap();
        assert_eq!(spec.stem, "CYP");
        assert_eq!(&spec.code, b"CY");
        assert_eq!(spec.region_id, 1);
        assert_eq!(spec.db_id, 1);

        let spec = RegionSpec::from_slug("eu/cy", 1).unwrap();
        assert_eq!(spec.stem, "CY");
        assert_eq!(&spec.code, b"CY");
        assert_eq!(spec.db_id, 2);
    }

    #[test]
    fn spec_from_degenerate_slug_fails() {
        assert!(RegionSpec::from_slug("//", 0).is_err());
    }

    #[test]
    fn short_stems_pad_the_code() {
        let spec = RegionSpec::from_slug("europe/a", 0).unwrap();
        assert_eq!(spec.stem, "A");
        assert_eq!(&spec.code, b"AX");
    }
}

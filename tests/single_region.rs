//! # Single-Region Build Scenarios
//!
//! End-to-end coverage of the single-region paths:
//!
//! - an empty record stream fails with `BboxInvalid` and leaves no output;
//! - the canonical one-road region produces a byte-exact 29-byte road
//!   parcel and a one-leaf global KD-tree pointing at offset 512;
//! - duplicate way ids fail with `DuplicateWayId`;
//! - streams that end without `End` fail with `InputExhausted`;
//! - cancellation aborts the build and removes the output.

use osm2sdal::format::{payload_crc, PclHdr, PCL_HEADER_SIZE, PID_NAV};
use osm2sdal::index::kdtree;
use osm2sdal::{
    build_iso, build_media_files, BuildError, BuildOptions, FormatMode, Point, Record,
    RegionInput, Road, VecSource,
};

fn road(way_id: u64, points: &[(i32, i32)]) -> Record {
    Record::Road(Road {
        way_id,
        class: 2,
        name: String::new(),
        points: points
            .iter()
            .map(|&(lat, lon)| Point { lat, lon })
            .collect(),
    })
}

fn build_one(
    records: Vec<Record>,
    opts: &BuildOptions,
) -> eyre::Result<std::collections::BTreeMap<String, Vec<u8>>> {
    let mut source = VecSource::new(records);
    let mut regions = [RegionInput {
        slug: "eu/cy".to_string(),
        source: &mut source,
    }];
    build_media_files(&mut regions, opts)
}

#[test]
fn empty_region_fails_with_bbox_invalid() {
    let err = build_one(vec![Record::End], &BuildOptions::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::BboxInvalid { region }) if region == "eu/cy"
    ));
}

#[test]
fn stream_without_end_fails_with_input_exhausted() {
    let err = build_one(
        vec![road(1, &[(0, 0), (1000, 1000)])],
        &BuildOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InputExhausted)
    ));
}

#[test]
fn single_road_region_produces_the_canonical_parcel() {
    let opts = BuildOptions {
        verify: true,
        ..BuildOptions::default()
    };
    let files = build_one(
        vec![
            road(42, &[(35_000_000, 33_000_000), (35_001_000, 33_001_000)]),
            Record::End,
        ],
        &opts,
    )
    .unwrap();

    let map = files.get("CY1.SDL").expect("map file present");
    let hdr = PclHdr::from_bytes(&map[512..]).unwrap();
    assert_eq!(hdr.pid(), PID_NAV);
    assert_eq!(hdr.payload_len(), 29);

    let payload = &map[512 + PCL_HEADER_SIZE..512 + PCL_HEADER_SIZE + 29];
    assert_eq!(hdr.crc32(), payload_crc(payload));
    // db_id of region 1.
    assert_eq!(u16::from_le_bytes([payload[0], payload[1]]), 1);
    assert_eq!(u64::from_le_bytes(payload[2..10].try_into().unwrap()), 42);
}

#[test]
fn single_road_region_gets_a_one_leaf_global_kdtree() {
    let files = build_one(
        vec![
            road(42, &[(35_000_000, 33_000_000), (35_001_000, 33_001_000)]),
            Record::End,
        ],
        &BuildOptions::default(),
    )
    .unwrap();

    let kd = files.get("KDTREE.SDL").expect("global KD-tree present");
    let hdr = PclHdr::from_bytes(&kd[512..]).unwrap();
    let payload = &kd[512 + PCL_HEADER_SIZE..512 + PCL_HEADER_SIZE + hdr.payload_len() as usize];
    let (bbox, records) = kdtree::parse_payload(payload).unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].is_leaf());
    assert_eq!(records[0].pid(), PID_NAV);
    assert_eq!(records[0].chain_offset(), 512);
    assert_eq!(bbox.min_lat, 35_000_000);
    assert_eq!(bbox.max_lat, 35_001_000);
}

#[test]
fn duplicate_way_id_fails_the_build() {
    let err = build_one(
        vec![
            road(7, &[(0, 0), (1000, 1000)]),
            road(7, &[(2000, 2000), (3000, 3000)]),
            Record::End,
        ],
        &BuildOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::DuplicateWayId { way_id: 7 })
    ));
}

#[test]
fn boundary_way_ids_survive_a_verified_build() {
    let opts = BuildOptions {
        verify: true,
        format_mode: FormatMode::Sdal,
        ..BuildOptions::default()
    };
    let files = build_one(
        vec![
            road(0, &[(0, 0), (1000, 1000)]),
            road(u64::MAX, &[(2000, 2000), (3000, 3000)]),
            Record::End,
        ],
        &opts,
    )
    .unwrap();
    assert!(files.contains_key("CY1.SDL"));
}

#[test]
fn failed_build_leaves_no_iso_behind() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("OUT.ISO");
    // A stale image from an earlier run must not survive a failed build.
    std::fs::write(&out, b"stale").unwrap();

    let mut source = VecSource::new(vec![Record::End]);
    let mut regions = [RegionInput {
        slug: "eu/cy".to_string(),
        source: &mut source,
    }];
    let err = build_iso(&mut regions, &BuildOptions::default(), &out).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::BboxInvalid { .. })
    ));
    assert!(!out.exists());
}

#[test]
fn cancellation_aborts_the_build() {
    let opts = BuildOptions::default();
    opts.cancel.cancel();

    let err = build_one(
        vec![road(1, &[(0, 0), (1000, 1000)]), Record::End],
        &opts,
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::Cancelled)
    ));
}

#[test]
fn successful_build_writes_a_conformant_iso() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("CY.ISO");

    let mut source = VecSource::new(vec![
        road(42, &[(35_000_000, 33_000_000), (35_001_000, 33_001_000)]),
        Record::End,
    ]);
    let mut regions = [RegionInput {
        slug: "eu/cy".to_string(),
        source: &mut source,
    }];
    build_iso(&mut regions, &BuildOptions::default(), &out).unwrap();

    let image = std::fs::read(&out).unwrap();
    // PVD magic at sector 16.
    assert_eq!(&image[16 * 2048 + 1..16 * 2048 + 6], b"CD001");
    assert_eq!(image.len() % 2048, 0);
}

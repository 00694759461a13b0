//! # Structural Invariants Over Built Archives
//!
//! Larger builds exercised through the public pipeline with verification
//! enabled, plus direct checks of the on-disc structures:
//!
//! - every parcel CRC holds and every chain terminates (via `verify`);
//! - region headers carry the PID table and raw wrapped bounding boxes;
//! - the way index forms internal levels over many parcels and stays
//!   key-ordered;
//! - density overlays index zero-byte tiles;
//! - decoding a parcel payload and re-sealing it reproduces the CRC.

use osm2sdal::format::{
    payload_crc, PclHdr, RgnHdr, PCL_HEADER_SIZE, PID_DENS0, PID_NAV, PID_WAYIDX,
};
use osm2sdal::index::wayidx::{NodeView, NODE_KIND_INTERNAL};
use osm2sdal::{
    build_media_files, BuildOptions, DensityTile, FormatMode, Point, Record, RegionInput, Road,
    VecSource,
};

fn road(way_id: u64, lat: i32, lon: i32) -> Record {
    Record::Road(Road {
        way_id,
        class: (way_id % 7) as u8,
        name: format!("street {}", way_id % 13),
        points: vec![
            Point { lat, lon },
            Point {
                lat: lat + 500,
                lon: lon + 500,
            },
            Point {
                lat: lat + 900,
                lon: lon - 300,
            },
        ],
    })
}

fn build_one(records: Vec<Record>, opts: &BuildOptions) -> std::collections::BTreeMap<String, Vec<u8>> {
    let mut source = VecSource::new(records);
    let mut regions = [RegionInput {
        slug: "eu/cy".to_string(),
        source: &mut source,
    }];
    build_media_files(&mut regions, opts).unwrap()
}

#[test]
fn large_build_passes_full_verification_in_both_modes() {
    let mut records: Vec<Record> = (0..500)
        .map(|i| road(i + 1, 35_000_000 + (i as i32) * 1800, 33_000_000 + (i as i32) * 1100))
        .collect();
    records.push(Record::End);

    for mode in [FormatMode::Oem, FormatMode::Sdal] {
        let opts = BuildOptions {
            format_mode: mode,
            // Small threshold to force many parcels and an internal B+-tree
            // level.
            parcel_threshold: 256,
            verify: true,
            ..BuildOptions::default()
        };
        build_one(records.clone(), &opts);
    }
}

#[test]
fn region_header_lists_every_pid_chain() {
    let mut records: Vec<Record> = (0..50)
        .map(|i| road(i + 1, 35_000_000 + (i as i32) * 1000, 33_000_000))
        .collect();
    records.push(Record::End);

    let opts = BuildOptions {
        format_mode: FormatMode::Sdal,
        parcel_threshold: 256,
        verify: true,
        ..BuildOptions::default()
    };
    let files = build_one(records, &opts);

    let map = files.get("CY1.SDL").unwrap();
    let hdr = RgnHdr::from_bytes(map).unwrap();
    assert_eq!(hdr.region_id(), 1);
    assert_eq!(hdr.region_code(), *b"CY");
    assert_eq!(hdr.unit_size(), 2048);

    let nav = hdr.pid_offset(PID_NAV).unwrap();
    assert_eq!(nav, 512);
    assert!(hdr.pid_offset(PID_WAYIDX).is_some());
    assert!(hdr.size_class_count() > 0);

    // The map file is exactly roads followed by the way index.
    assert_eq!(hdr.pid_count(), 2);
}

#[test]
fn way_index_grows_an_internal_level_and_stays_ordered() {
    let mut records: Vec<Record> = (0..300)
        .map(|i| road((i * 7 + 3) as u64, 35_000_000 + (i as i32) * 900, 33_000_000))
        .collect();
    records.push(Record::End);

    let opts = BuildOptions {
        format_mode: FormatMode::Sdal,
        parcel_threshold: 512,
        verify: true,
        ..BuildOptions::default()
    };
    let files = build_one(records, &opts);
    let map = files.get("CY1.SDL").unwrap();

    let root_offset = RgnHdr::from_bytes(map)
        .unwrap()
        .pid_offset(PID_WAYIDX)
        .unwrap();
    let hdr = PclHdr::from_bytes(&map[root_offset as usize..]).unwrap();
    let payload =
        &map[root_offset as usize + PCL_HEADER_SIZE..root_offset as usize + PCL_HEADER_SIZE + hdr.payload_len() as usize];
    let root = NodeView::parse(payload).unwrap();

    // 300 keys at 48 per leaf -> 7 leaves under one internal root.
    assert_eq!(root.kind, NODE_KIND_INTERNAL);
    assert_eq!(root.count, 6);
    for i in 1..root.count as usize {
        assert!(root.key(i - 1) < root.key(i));
    }
}

#[test]
fn wrapping_region_stores_raw_bbox_values() {
    let records = vec![
        road(1, 0, 170_000_000),
        road(2, 500_000, -170_000_000),
        Record::End,
    ];
    let opts = BuildOptions {
        format_mode: FormatMode::Sdal,
        ..BuildOptions::default()
    };
    let files = build_one(records, &opts);

    let map = files.get("CY1.SDL").unwrap();
    let bbox = RgnHdr::from_bytes(map).unwrap().bbox();
    // Anti-meridian region: min above max, stored raw. The western edge is
    // the first road's westernmost point.
    assert_eq!(bbox.min_lon, 169_999_700);
    assert_eq!(bbox.max_lon, -169_999_500);
    assert!(bbox.min_lon > bbox.max_lon);
}

#[test]
fn density_tiles_flow_into_the_dens_files() {
    let records = vec![
        road(1, 35_000_000, 33_000_000),
        Record::DensityTile(DensityTile {
            x: 1,
            y: 2,
            zoom: 3,
            bytes: vec![0xAA; 64],
        }),
        Record::DensityTile(DensityTile {
            x: 2,
            y: 2,
            zoom: 3,
            bytes: vec![],
        }),
        Record::End,
    ];
    let opts = BuildOptions {
        verify: true,
        ..BuildOptions::default()
    };
    let files = build_one(records, &opts);

    let dir = files.get("DENSCY0.SDL").expect("density directory present");
    assert!(files.contains_key("DENSCY1.SDL"));

    let hdr = PclHdr::from_bytes(&dir[512..]).unwrap();
    assert_eq!(hdr.pid(), PID_DENS0);
    let payload = &dir[512 + PCL_HEADER_SIZE..512 + PCL_HEADER_SIZE + hdr.payload_len() as usize];
    assert_eq!(u32::from_le_bytes(payload[0..4].try_into().unwrap()), 2);

    // Second entry is the zero-byte tile at logical offset 64.
    let e1 = &payload[4 + 12..4 + 24];
    assert_eq!(
        u32::from_le_bytes(e1[0..4].try_into().unwrap()),
        (3u32 << 28) | (2 << 14) | 2
    );
    assert_eq!(u32::from_le_bytes(e1[4..8].try_into().unwrap()), 64);
    assert_eq!(u32::from_le_bytes(e1[8..12].try_into().unwrap()), 0);
}

#[test]
fn decoded_payloads_reseal_to_the_same_crc() {
    let records = vec![road(9, 35_000_000, 33_000_000), Record::End];
    let files = build_one(records, &BuildOptions::default());

    for (name, image) in &files {
        if name == "REGIONS.SDL" || name == "MTOC.SDL" {
            continue;
        }
        let mut at = 512usize;
        while at < image.len() {
            let hdr = PclHdr::from_bytes(&image[at..]).unwrap();
            let payload = &image[at + PCL_HEADER_SIZE..at + PCL_HEADER_SIZE + hdr.payload_len() as usize];
            // Decode then re-encode: the payload bytes alone determine the
            // stored CRC.
            let copy = payload.to_vec();
            assert_eq!(payload_crc(&copy), hdr.crc32(), "{} offset {}", name, at);

            let framed = PCL_HEADER_SIZE + hdr.payload_len() as usize;
            at += framed + (framed.wrapping_neg() & 2047);
        }
    }
}

#[test]
fn name_references_are_shared_between_roads_and_pois() {
    let records = vec![
        Record::Road(Road {
            way_id: 1,
            class: 0,
            name: "Shared Name".to_string(),
            points: vec![
                Point {
                    lat: 35_000_000,
                    lon: 33_000_000,
                },
                Point {
                    lat: 35_001_000,
                    lon: 33_001_000,
                },
            ],
        }),
        Record::Poi(osm2sdal::Poi {
            class: 1,
            lat: 35_000_500,
            lon: 33_000_500,
            name: "Shared Name".to_string(),
        }),
        Record::End,
    ];
    let files = build_one(records, &BuildOptions { verify: true, ..BuildOptions::default() });

    // Road record name_ref sits at payload offset 11; the POI's at record
    // offset 9. Both reference table offset 0.
    let map = files.get("CY1.SDL").unwrap();
    let road_payload = &map[512 + PCL_HEADER_SIZE..];
    assert_eq!(
        u32::from_le_bytes(road_payload[11..15].try_into().unwrap()),
        0
    );

    let meta = files.get("CY0.SDL").unwrap();
    let mut at = 512usize;
    let mut poi_ref = None;
    while at < meta.len() {
        let hdr = PclHdr::from_bytes(&meta[at..]).unwrap();
        if hdr.pid() == osm2sdal::format::PID_POIGEOM {
            let payload = &meta[at + PCL_HEADER_SIZE..at + PCL_HEADER_SIZE + hdr.payload_len() as usize];
            poi_ref = Some(u32::from_le_bytes(payload[9..13].try_into().unwrap()));
        }
        let framed = PCL_HEADER_SIZE + hdr.payload_len() as usize;
        at += framed + (framed.wrapping_neg() & 2047);
    }
    assert_eq!(poi_ref, Some(0));
}

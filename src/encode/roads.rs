//! # Road Encoder
//!
//! Packs road records into `PID_NAV` parcel payloads.
//!
//! ## Payload Layout
//!
//! ```text
//! db_id        u16      region database id (cross-checked by the firmware
//!                       against the CARTOTOP directory entry)
//! records...            back-to-back, no count field; the B+-tree provides
//!                       random access and the payload length bounds scans
//! ```
//!
//! ## Record Layout
//!
//! ```text
//! way_id       u64
//! class        u8
//! name_ref     u32      byte offset into the region name table
//! point_count  u16
//! points       point_count x (lat i24, lon i24)
//! ```
//!
//! The first point is absolute in anchor units of 100 microdegrees; every
//! following point is an exact microdegree delta from the previously decoded
//! point. Decoding therefore needs no out-of-band anchor.
//!
//! Records are emitted in upstream order and never reordered. When the open
//! payload reaches the parcel threshold it is sealed; the encoder then
//! reports the sealed parcel's bounding box (KD-tree input) and one
//! `(way_id, file, parcel_offset)` triple per contained way (B+-tree input).

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;

use crate::config::ANCHOR_UNIT_MICRODEG;
use crate::format::headers::PID_NAV;
use crate::format::ParcelArea;
use crate::geo::{put_i24, Bbox};
use crate::index::spill::WayTriple;
use crate::records::Road;

/// File index stored in B+-tree values: the region map file.
pub const FILE_MAP: u16 = 0;
/// File index of the region metadata file.
pub const FILE_META: u16 = 1;

/// Metadata of one sealed road parcel, consumed by the KD-tree builder.
#[derive(Debug, Clone, Copy)]
pub struct RoadParcelMeta {
    pub offset: u32,
    pub bbox: Bbox,
}

pub struct RoadEncoder {
    threshold: usize,
    buf: Vec<u8>,
    open_ways: Vec<u64>,
    open_bboxes: Vec<Bbox>,
    parcels: Vec<RoadParcelMeta>,
    triples: Vec<WayTriple>,
}

impl RoadEncoder {
    pub fn new(db_id: u16, threshold: usize) -> Self {
        Self {
            threshold,
            buf: payload_prefix(db_id),
            open_ways: Vec::new(),
            open_bboxes: Vec::new(),
            parcels: Vec::new(),
            triples: Vec::new(),
        }
    }

    /// Encodes one road. Roads with no points carry no geometry and are
    /// dropped.
    pub fn push(&mut self, road: &Road, name_ref: u32, area: &mut ParcelArea) -> Result<()> {
        let Some(bbox) = road.bbox() else {
            return Ok(());
        };

        let mut record: SmallVec<[u8; 64]> = SmallVec::new();
        encode_record(&mut record, road, name_ref)?;

        if self.buf.len() > PAYLOAD_PREFIX_LEN && self.buf.len() + record.len() > self.threshold {
            self.seal(area)?;
        }

        self.buf.extend_from_slice(&record);
        self.open_ways.push(road.way_id);
        self.open_bboxes.push(bbox);
        Ok(())
    }

    /// Seals the open payload, recording parcel metadata and way triples.
    fn seal(&mut self, area: &mut ParcelArea) -> Result<()> {
        let Some(bbox) = crate::geo::union(&self.open_bboxes) else {
            return Ok(());
        };
        self.open_bboxes.clear();
        let offset = area.seal(PID_NAV, &self.buf)?;
        self.parcels.push(RoadParcelMeta { offset, bbox });
        for way_id in self.open_ways.drain(..) {
            self.triples.push(WayTriple::new(way_id, FILE_MAP, offset));
        }
        let db_id = u16::from_le_bytes([self.buf[0], self.buf[1]]);
        self.buf = payload_prefix(db_id);
        Ok(())
    }

    /// Seals any open payload and returns the collected index inputs.
    pub fn finish(mut self, area: &mut ParcelArea) -> Result<(Vec<RoadParcelMeta>, Vec<WayTriple>)> {
        self.seal(area)?;
        Ok((self.parcels, self.triples))
    }
}

const PAYLOAD_PREFIX_LEN: usize = 2;

fn payload_prefix(db_id: u16) -> Vec<u8> {
    db_id.to_le_bytes().to_vec()
}

fn encode_record(out: &mut SmallVec<[u8; 64]>, road: &Road, name_ref: u32) -> Result<()> {
    ensure!(
        road.points.len() <= u16::MAX as usize,
        "road {} has {} points, more than a record can hold",
        road.way_id,
        road.points.len()
    );

    out.extend_from_slice(&road.way_id.to_le_bytes());
    out.push(road.class);
    out.extend_from_slice(&name_ref.to_le_bytes());
    out.extend_from_slice(&(road.points.len() as u16).to_le_bytes());

    let mut scratch = Vec::with_capacity(road.points.len() * 6);
    let first = road.points[0];
    let anchor_lat = round_to_anchor(first.lat);
    let anchor_lon = round_to_anchor(first.lon);
    put_i24(&mut scratch, anchor_lat)?;
    put_i24(&mut scratch, anchor_lon)?;

    let mut prev = (
        anchor_lat * ANCHOR_UNIT_MICRODEG,
        anchor_lon * ANCHOR_UNIT_MICRODEG,
    );
    for p in &road.points[1..] {
        let dlat = p.lat as i64 - prev.0 as i64;
        let dlon = p.lon as i64 - prev.1 as i64;
        if i32::try_from(dlat).is_err() || i32::try_from(dlon).is_err() {
            bail!(
                "point step in way {} too large for a delta field",
                road.way_id
            );
        }
        put_i24(&mut scratch, dlat as i32)?;
        put_i24(&mut scratch, dlon as i32)?;
        prev = (p.lat, p.lon);
    }
    out.extend_from_slice(&scratch);
    Ok(())
}

/// Rounds a microdegree coordinate to the nearest anchor unit.
fn round_to_anchor(v: i32) -> i32 {
    let half = ANCHOR_UNIT_MICRODEG / 2;
    if v >= 0 {
        (v + half) / ANCHOR_UNIT_MICRODEG
    } else {
        (v - half) / ANCHOR_UNIT_MICRODEG
    }
}

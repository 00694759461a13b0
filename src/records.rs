//! # Upstream Record Stream
//!
//! The builder consumes a normalized record stream produced by an external
//! OSM parser. The stream is pull-based and single-pass: the region builder
//! calls [`RecordSource::next_record`] until it sees [`Record::End`].
//!
//! A source that runs dry (`Ok(None)`) before yielding `End` ended
//! mid-region; the builder turns that into `BuildError::InputExhausted`.
//!
//! Coordinates are signed 32-bit micro-degrees throughout.

use crate::geo::Bbox;
use eyre::Result;

/// One polyline point in micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub lat: i32,
    pub lon: i32,
}

/// A drivable way: the unit the road encoder and both indexes key on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Road {
    pub way_id: u64,
    pub class: u8,
    pub name: String,
    pub points: Vec<Point>,
}

impl Road {
    /// Bounding box over the way's points; `None` for an empty polyline.
    pub fn bbox(&self) -> Option<Bbox> {
        let mut points = self.points.iter();
        let first = points.next()?;
        let mut bbox = Bbox::from_point(first.lat, first.lon);
        for p in points {
            bbox.include(p.lat, p.lon);
        }
        Some(bbox)
    }
}

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poi {
    pub class: u8,
    pub lat: i32,
    pub lon: i32,
    pub name: String,
}

/// One raster tile of the density overlay. `bytes` may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensityTile {
    pub x: u16,
    pub y: u16,
    pub zoom: u8,
    pub bytes: Vec<u8>,
}

impl DensityTile {
    /// Packed directory key: `zoom << 28 | x << 14 | y`.
    pub fn key(&self) -> u32 {
        ((self.zoom as u32) << 28) | ((self.x as u32) << 14) | (self.y as u32)
    }
}

/// Tagged record variants of the upstream stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Road(Road),
    Poi(Poi),
    DensityTile(DensityTile),
    End,
}

/// Pull-based producer of one region's records.
///
/// Implementations are free to stream from disk; the builder never buffers
/// more than the records of the parcel currently being filled.
pub trait RecordSource {
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// In-memory source, used by the tests and by callers that already hold the
/// full record list.
pub struct VecSource {
    records: std::vec::IntoIter<Record>,
}

impl VecSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }

    /// Convenience constructor that appends the terminating `End`.
    pub fn terminated(mut records: Vec<Record>) -> Self {
        records.push(Record::End);
        Self::new(records)
    }
}

impl RecordSource for VecSource {
    fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.records.next())
    }
}

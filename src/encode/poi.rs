//! # POI Geometry Encoder
//!
//! Packs points of interest into `PID_POIGEOM` parcels in the region
//! metadata file. One fixed 13-byte record per POI:
//!
//! ```text
//! class     u8
//! lat       i32   microdegrees
//! lon       i32   microdegrees
//! name_ref  u32   byte offset into the region name table
//! ```

use eyre::Result;

use crate::format::headers::PID_POIGEOM;
use crate::format::ParcelArea;
use crate::records::Poi;

pub const POI_RECORD_SIZE: usize = 13;

pub struct PoiEncoder {
    threshold: usize,
    buf: Vec<u8>,
    count: u64,
}

impl PoiEncoder {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            buf: Vec::new(),
            count: 0,
        }
    }

    pub fn push(&mut self, poi: &Poi, name_ref: u32, area: &mut ParcelArea) -> Result<()> {
        if !self.buf.is_empty() && self.buf.len() + POI_RECORD_SIZE > self.threshold {
            area.seal(PID_POIGEOM, &self.buf)?;
            self.buf.clear();
        }
        self.buf.push(poi.class);
        self.buf.extend_from_slice(&poi.lat.to_le_bytes());
        self.buf.extend_from_slice(&poi.lon.to_le_bytes());
        self.buf.extend_from_slice(&name_ref.to_le_bytes());
        self.count += 1;
        Ok(())
    }

    pub fn finish(self, area: &mut ParcelArea) -> Result<u64> {
        if !self.buf.is_empty() {
            area.seal(PID_POIGEOM, &self.buf)?;
        }
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_PARCEL_THRESHOLD, DEFAULT_UNIT_SIZE};
    use crate::format::PclHdr;

    fn poi(name_lat: i32) -> Poi {
        Poi {
            class: 5,
            lat: name_lat,
            lon: -33_000_000,
            name: "cafe".into(),
        }
    }

    #[test]
    fn record_layout_is_13_bytes() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let mut enc = PoiEncoder::new(DEFAULT_PARCEL_THRESHOLD);
        enc.push(&poi(35_000_000), 77, &mut area).unwrap();
        assert_eq!(enc.finish(&mut area).unwrap(), 1);

        let image = area.finish(&[0u8; 512]);
        let hdr = PclHdr::from_bytes(&image[512..]).unwrap();
        assert_eq!(hdr.payload_len() as usize, POI_RECORD_SIZE);

        let payload = &image[512 + 16..512 + 16 + POI_RECORD_SIZE];
        assert_eq!(payload[0], 5);
        assert_eq!(
            i32::from_le_bytes(payload[1..5].try_into().unwrap()),
            35_000_000
        );
        assert_eq!(
            i32::from_le_bytes(payload[5..9].try_into().unwrap()),
            -33_000_000
        );
        assert_eq!(u32::from_le_bytes(payload[9..13].try_into().unwrap()), 77);
    }

    #[test]
    fn threshold_splits_poi_parcels() {
        let mut area = ParcelArea::new(DEFAULT_UNIT_SIZE);
        let mut enc = PoiEncoder::new(POI_RECORD_SIZE * 2);
        for i in 0..5 {
            enc.push(&poi(i), 0, &mut area).unwrap();
        }
        assert_eq!(enc.finish(&mut area).unwrap(), 5);

        // 5 records at 2 per parcel -> 3 parcels chained under PID_POIGEOM.
        let mut count = 0;
        let image = area.finish(&[0u8; 512]);
        let mut offset = 512usize;
        while offset < image.len() {
            let hdr = PclHdr::from_bytes(&image[offset..]).unwrap();
            assert_eq!(hdr.pid(), PID_POIGEOM);
            count += 1;
            if hdr.ends_chain() {
                break;
            }
            offset = hdr.next_offset() as usize;
        }
        assert_eq!(count, 3);
    }
}

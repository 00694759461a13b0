//! # PBF Record Source
//!
//! Adapts an OpenStreetMap `.osm.pbf` extract to the builder's
//! [`RecordSource`] interface. This is the reader the CLI wires in; the
//! core never depends on it and accepts any source implementation.
//!
//! Reading is two-pass, the usual shape for pbf extracts: the first pass
//! caches node coordinates (and collects tagged nodes as POIs), the second
//! resolves way node references into polylines. Only drivable highway ways
//! become roads.

use std::path::Path;

use eyre::{Result, WrapErr};
use hashbrown::HashMap;
use osmpbf::{Element, ElementReader};

use crate::records::{Point, Poi, Record, RecordSource, Road};

/// Highway classes the navigation layer keeps, from fastest to slowest.
const HIGHWAY_CLASSES: &[(&str, u8)] = &[
    ("motorway", 0),
    ("motorway_link", 0),
    ("trunk", 1),
    ("trunk_link", 1),
    ("primary", 2),
    ("primary_link", 2),
    ("secondary", 3),
    ("secondary_link", 3),
    ("tertiary", 4),
    ("tertiary_link", 4),
    ("unclassified", 5),
    ("residential", 5),
    ("living_street", 6),
    ("service", 6),
];

/// Node tag keys that mark a point of interest.
const POI_TAGS: &[&str] = &[
    "amenity",
    "shop",
    "tourism",
    "leisure",
    "historic",
    "office",
    "craft",
    "man_made",
    "healthcare",
    "sport",
    "emergency",
    "public_transport",
    "railway",
    "aeroway",
    "natural",
];

pub struct PbfSource {
    records: std::vec::IntoIter<Record>,
}

impl PbfSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut coords: HashMap<i64, (i32, i32)> = HashMap::new();
        let mut pois: Vec<Poi> = Vec::new();

        let reader = ElementReader::from_path(path)
            .wrap_err_with(|| format!("failed to open {}", path.display()))?;
        reader
            .for_each(|element| match element {
                Element::Node(node) => {
                    let lat = microdeg(node.lat());
                    let lon = microdeg(node.lon());
                    coords.insert(node.id(), (lat, lon));
                    if let Some(poi) = node_poi(node.tags(), lat, lon) {
                        pois.push(poi);
                    }
                }
                Element::DenseNode(node) => {
                    let lat = microdeg(node.lat());
                    let lon = microdeg(node.lon());
                    coords.insert(node.id(), (lat, lon));
                    if let Some(poi) = node_poi(node.tags(), lat, lon) {
                        pois.push(poi);
                    }
                }
                _ => {}
            })
            .wrap_err("failed to read nodes from pbf")?;

        let mut roads: Vec<Road> = Vec::new();
        let reader = ElementReader::from_path(path)
            .wrap_err_with(|| format!("failed to reopen {}", path.display()))?;
        reader
            .for_each(|element| {
                if let Element::Way(way) = element {
                    let mut class = None;
                    let mut name = String::new();
                    for (key, value) in way.tags() {
                        match key {
                            "highway" => class = highway_class(value),
                            "name" => name = value.to_string(),
                            _ => {}
                        }
                    }
                    let Some(class) = class else {
                        return;
                    };
                    let points: Vec<Point> = way
                        .refs()
                        .filter_map(|id| coords.get(&id))
                        .map(|&(lat, lon)| Point { lat, lon })
                        .collect();
                    if points.len() < 2 {
                        return;
                    }
                    roads.push(Road {
                        way_id: way.id() as u64,
                        class,
                        name,
                        points,
                    });
                }
            })
            .wrap_err("failed to read ways from pbf")?;

        log::info!(
            "{}: {} drivable roads, {} POIs",
            path.display(),
            roads.len(),
            pois.len()
        );

        let mut records: Vec<Record> =
            Vec::with_capacity(roads.len() + pois.len() + 1);
        records.extend(roads.into_iter().map(Record::Road));
        records.extend(pois.into_iter().map(Record::Poi));
        records.push(Record::End);
        Ok(Self {
            records: records.into_iter(),
        })
    }
}

impl RecordSource for PbfSource {
    fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.records.next())
    }
}

fn microdeg(deg: f64) -> i32 {
    (deg * 1e6).round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

fn highway_class(value: &str) -> Option<u8> {
    HIGHWAY_CLASSES
        .iter()
        .find(|&&(name, _)| name == value)
        .map(|&(_, class)| class)
}

fn node_poi<'a, I: Iterator<Item = (&'a str, &'a str)>>(
    tags: I,
    lat: i32,
    lon: i32,
) -> Option<Poi> {
    let mut class = None;
    let mut name = String::new();
    for (key, value) in tags {
        if key == "name" {
            name = value.to_string();
        } else if class.is_none() {
            if let Some(i) = POI_TAGS.iter().position(|&t| t == key) {
                class = Some(i as u8);
            }
        }
    }
    class.map(|class| Poi {
        class,
        lat,
        lon,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highway_classes_cover_the_drivable_set() {
        assert_eq!(highway_class("motorway"), Some(0));
        assert_eq!(highway_class("residential"), Some(5));
        assert_eq!(highway_class("footway"), None);
        assert_eq!(highway_class("cycleway"), None);
    }

    #[test]
    fn tagged_named_nodes_become_pois() {
        let tags = [("amenity", "cafe"), ("name", "Corner Cafe")];
        let poi = node_poi(tags.into_iter(), 1, 2).unwrap();
        assert_eq!(poi.class, 0);
        assert_eq!(poi.name, "Corner Cafe");

        let tags = [("note", "nothing")];
        assert!(node_poi(tags.into_iter(), 1, 2).is_none());
    }

    #[test]
    fn microdeg_rounds_and_clamps() {
        assert_eq!(microdeg(35.0000004), 35_000_000);
        assert_eq!(microdeg(-179.9999995), -180_000_000);
    }
}

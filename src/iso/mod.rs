//! # ISO Writer Façade
//!
//! Presents the "named files in, ISO image out" interface the media
//! assembler targets. The serializer itself lives in `writer` and produces
//! interchange-level-1 images; nothing outside this module deals with
//! sectors or volume descriptors.

pub mod writer;

pub use writer::{IsoWriter, SECTOR_SIZE};

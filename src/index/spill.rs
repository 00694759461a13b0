//! # Way Triple Collection and External Sort
//!
//! The B+-tree builder needs every `(way_id, file, parcel_offset)` triple of
//! a region in key order. For small regions the triples sort in memory; a
//! continent-sized region can reach ~10^8 entries, so above a configurable
//! threshold the collector spills to a temporary file and sorts the entries
//! in place through a memory mapping. The entry struct is zerocopy-safe, so
//! the mapped bytes are sorted directly with no deserialization pass.
//!
//! Way ids must be unique; the sorted pass rejects neighbours with equal
//! keys as `DuplicateWayId`.

use std::fs::File;
use std::io::{BufWriter, Write};

use eyre::{Result, WrapErr};
use memmap2::MmapMut;
use zerocopy::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::BuildError;

pub const WAY_TRIPLE_SIZE: usize = 16;

/// One B+-tree input entry. 16 bytes so the spill file stays slice-castable.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct WayTriple {
    way_id: U64,
    file_index: U16,
    reserved: [u8; 2],
    offset: U32,
}

const _: () = assert!(std::mem::size_of::<WayTriple>() == WAY_TRIPLE_SIZE);

impl WayTriple {
    pub fn new(way_id: u64, file_index: u16, offset: u32) -> Self {
        Self {
            way_id: U64::new(way_id),
            file_index: U16::new(file_index),
            reserved: [0; 2],
            offset: U32::new(offset),
        }
    }

    zerocopy_getters! {
        way_id: u64,
        file_index: u16,
        offset: u32,
    }
}

enum Backing {
    Mem(Vec<WayTriple>),
    Spilled { writer: BufWriter<File>, count: usize },
}

/// Collects triples during encoding and hands back a key-sorted view.
pub struct TripleSorter {
    spill_threshold: usize,
    backing: Backing,
}

impl TripleSorter {
    pub fn new(spill_threshold: usize) -> Self {
        Self {
            spill_threshold,
            backing: Backing::Mem(Vec::new()),
        }
    }

    pub fn push(&mut self, triple: WayTriple) -> Result<()> {
        match &mut self.backing {
            Backing::Mem(vec) => {
                vec.push(triple);
                if vec.len() >= self.spill_threshold {
                    self.spill()?;
                }
            }
            Backing::Spilled { writer, count } => {
                writer
                    .write_all(triple.as_bytes())
                    .wrap_err("failed to append way triple to spill file")?;
                *count += 1;
            }
        }
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = WayTriple>>(&mut self, triples: I) -> Result<()> {
        for t in triples {
            self.push(t)?;
        }
        Ok(())
    }

    fn spill(&mut self) -> Result<()> {
        let Backing::Mem(vec) = std::mem::replace(
            &mut self.backing,
            Backing::Spilled {
                writer: BufWriter::new(
                    tempfile::tempfile().wrap_err("failed to create spill file")?,
                ),
                count: 0,
            },
        ) else {
            return Ok(());
        };
        let Backing::Spilled { writer, count } = &mut self.backing else {
            unreachable!()
        };
        for t in &vec {
            writer
                .write_all(t.as_bytes())
                .wrap_err("failed to migrate way triples to spill file")?;
        }
        *count = vec.len();
        log::debug!("way triple sorter spilled {} entries to disk", vec.len());
        Ok(())
    }

    /// Sorts by way id and verifies uniqueness.
    pub fn finish(self) -> Result<SortedTriples> {
        let mut sorted = match self.backing {
            Backing::Mem(mut vec) => {
                vec.sort_by_key(|t| t.way_id());
                SortedTriples::Mem(vec)
            }
            Backing::Spilled { writer, count } => {
                let file = writer
                    .into_inner()
                    .map_err(|e| eyre::eyre!("failed to flush spill file: {}", e.error()))?;
                // SAFETY: the file was created by tempfile() with exclusive
                // access and is owned by this mapping for its whole lifetime;
                // nothing else writes it while mapped, and the entry type is
                // Unaligned + FromBytes/IntoBytes so any byte content is a
                // valid slice.
                let mut mmap = unsafe {
                    MmapMut::map_mut(&file).wrap_err("failed to map spill file")?
                };
                {
                    let entries = <[WayTriple]>::mut_from_bytes(&mut mmap[..count * WAY_TRIPLE_SIZE])
                        .map_err(|e| eyre::eyre!("spill file is not entry-aligned: {:?}", e))?;
                    entries.sort_unstable_by_key(|t| t.way_id());
                }
                SortedTriples::Spilled { mmap, count }
            }
        };

        if let Some(dup) = find_duplicate(sorted.as_slice()) {
            return Err(BuildError::DuplicateWayId { way_id: dup }.into());
        }
        if let SortedTriples::Mem(vec) = &mut sorted {
            vec.shrink_to_fit();
        }
        Ok(sorted)
    }
}

fn find_duplicate(entries: &[WayTriple]) -> Option<u64> {
    entries
        .windows(2)
        .find(|w| w[0].way_id() == w[1].way_id())
        .map(|w| w[0].way_id())
}

/// Key-ordered triples, either in memory or inside the spill mapping.
#[derive(Debug)]
pub enum SortedTriples {
    Mem(Vec<WayTriple>),
    Spilled { mmap: MmapMut, count: usize },
}

impl SortedTriples {
    pub fn as_slice(&self) -> &[WayTriple] {
        match self {
            SortedTriples::Mem(vec) => vec,
            SortedTriples::Spilled { mmap, count } => {
                <[WayTriple]>::ref_from_bytes(&mmap[..count * WAY_TRIPLE_SIZE])
                    .expect("spill mapping was validated at finish time")
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SortedTriples::Mem(vec) => vec.len(),
            SortedTriples::Spilled { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

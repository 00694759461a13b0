//! # Build Orchestration
//!
//! The top-level pipeline: one pull pass per region through the encoders,
//! index construction, media assembly, optional self-verification, and the
//! atomic ISO write. Everything runs single-threaded; parcel offsets are
//! assigned incrementally and the way index needs one globally sorted pass,
//! so the core deliberately has no parallelism.
//!
//! ## Failure Semantics
//!
//! Every error is fatal. The ISO is written to a temporary file and renamed
//! only on success, so no partial image ever exists; on failure any
//! previously existing output is removed as well. Cancellation is polled at
//! record granularity and surfaces as `BuildError::Cancelled` with the same
//! cleanup.
//!
//! ## Determinism
//!
//! Two builds over the same records and options produce byte-identical
//! ISOs: the creation timestamp is caller data (0 for reproducible builds),
//! file maps iterate in name order, and every sort in the pipeline is
//! stable or keyed on unique values.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{ensure, Result};

use crate::assemble::{assemble_media, build_region, RegionSpec};
use crate::config::{DEFAULT_PARCEL_THRESHOLD, DEFAULT_SPILL_THRESHOLD, DEFAULT_UNIT_SIZE};
use crate::iso::IsoWriter;
use crate::records::RecordSource;
use crate::verify::verify_files;

/// File framing profile. Payload bytes are identical in both modes; only
/// the 512-byte file prefixes differ, and OEM mode adds the legacy
/// `REGIONS.SDL`/`MTOC.SDL` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    Oem,
    Sdal,
}

impl std::str::FromStr for FormatMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OEM" => Ok(FormatMode::Oem),
            "SDAL" => Ok(FormatMode::Sdal),
            other => Err(eyre::eyre!("unknown format mode {:?}", other)),
        }
    }
}

/// Caller-held cancellation flag, polled between records.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub format_mode: FormatMode,
    /// Primary language identifier in the media header.
    pub language: [u8; 3],
    /// Comma-separated supplementary languages.
    pub supp_langs: String,
    /// Media creation timestamp (Unix seconds); 0 for reproducible builds.
    pub creation_time: u64,
    pub unit_size: u32,
    pub parcel_threshold: usize,
    pub spill_threshold: usize,
    /// Re-read and re-check the assembled files before writing the ISO.
    pub verify: bool,
    pub cancel: CancelToken,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            format_mode: FormatMode::Oem,
            language: *b"UKE",
            supp_langs: String::new(),
            creation_time: 0,
            unit_size: DEFAULT_UNIT_SIZE,
            parcel_threshold: DEFAULT_PARCEL_THRESHOLD,
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            verify: false,
            cancel: CancelToken::new(),
        }
    }
}

/// One region's input: its slug and its record stream.
pub struct RegionInput<'a> {
    pub slug: String,
    pub source: &'a mut dyn RecordSource,
}

/// Runs the full pipeline up to (but excluding) ISO serialization and
/// returns the named file images.
pub fn build_media_files(
    regions: &mut [RegionInput<'_>],
    opts: &BuildOptions,
) -> Result<BTreeMap<String, Vec<u8>>> {
    ensure!(!regions.is_empty(), "no region slugs given");
    ensure!(
        opts.unit_size.is_power_of_two() && opts.unit_size >= 512,
        "unit size {} is not a power of two >= 512",
        opts.unit_size
    );

    let mut outputs = Vec::with_capacity(regions.len());
    for (index, region) in regions.iter_mut().enumerate() {
        let spec = RegionSpec::from_slug(&region.slug, index)?;
        log::info!("building region {} ({})", region.slug, spec.stem);
        outputs.push(build_region(spec, region.source, opts)?);
    }

    let files = assemble_media(&outputs, opts)?;
    if opts.verify {
        verify_files(&files, opts)?;
    }
    Ok(files)
}

/// Builds the archive and writes the ISO image at `out_path`. On any error
/// the output path is left without a (possibly partial) image.
pub fn build_iso(
    regions: &mut [RegionInput<'_>],
    opts: &BuildOptions,
    out_path: &Path,
) -> Result<()> {
    let result = build_and_write(regions, opts, out_path);
    if result.is_err() {
        // The write itself is atomic; this removes a stale image from an
        // earlier run so a failed build never exits with an output present.
        let _ = std::fs::remove_file(out_path);
    }
    result
}

fn build_and_write(
    regions: &mut [RegionInput<'_>],
    opts: &BuildOptions,
    out_path: &Path,
) -> Result<()> {
    let volume_id = regions
        .first()
        .map(|r| format!("SDAL_{}", crate::assemble::baked::disc_code(&r.slug)))
        .unwrap_or_else(|| "SDAL".to_string());

    let files = build_media_files(regions, opts)?;

    let mut writer = IsoWriter::new(&volume_id, opts.creation_time);
    for (name, bytes) in files {
        writer.add_file(&name, bytes)?;
    }
    writer.write_to(out_path)?;
    log::info!("wrote {}", out_path.display());
    Ok(())
}

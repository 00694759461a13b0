//! # osm2sdal CLI Entry Point
//!
//! Thin wrapper around the library pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Build a single-region disc
//! osm2sdal europe/cyprus --work ./work
//!
//! # Two regions, SDAL framing, explicit output
//! osm2sdal europe/cyprus europe/malta --out disc.iso --format-mode SDAL
//!
//! # Supplementary languages
//! osm2sdal europe/cyprus --supp-lang DAN,DUT
//! ```
//!
//! Region extracts are expected at `<work>/<slug with '/' as '-'>.osm.pbf`;
//! downloading them is out of scope for this tool.

use std::path::PathBuf;

use eyre::{bail, ensure, Result, WrapErr};
use osm2sdal::osm::PbfSource;
use osm2sdal::{build_iso, BuildOptions, RegionInput};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let mut slugs: Vec<String> = Vec::new();
    let mut out: Option<PathBuf> = None;
    let mut work: Option<PathBuf> = None;
    let mut options = BuildOptions::default();
    let mut engine = "auto".to_string();
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("osm2sdal {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--out" => {
                out = Some(PathBuf::from(take_value(&args, &mut i, "--out")?));
            }
            "--work" => {
                work = Some(PathBuf::from(take_value(&args, &mut i, "--work")?));
            }
            "--format-mode" => {
                options.format_mode = take_value(&args, &mut i, "--format-mode")?.parse()?;
            }
            "--supp-lang" => {
                options.supp_langs = take_value(&args, &mut i, "--supp-lang")?.to_string();
            }
            "--engine" => {
                engine = take_value(&args, &mut i, "--engine")?.to_string();
                ensure!(
                    matches!(engine.as_str(), "osmium" | "pyrosm" | "auto"),
                    "unknown engine {:?}",
                    engine
                );
            }
            "--verify" => {
                options.verify = true;
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            arg if arg.starts_with('-') => {
                bail!("unknown option: {}", arg);
            }
            arg => {
                slugs.push(arg.to_string());
            }
        }
        i += 1;
    }

    env_logger::Builder::from_default_env()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    // A trailing positional that is not a region slug is the output path.
    if out.is_none() && slugs.len() > 1 && !slugs.last().unwrap().contains('/') {
        out = Some(PathBuf::from(slugs.pop().unwrap()));
    }
    ensure!(!slugs.is_empty(), "no region slugs given; see --help");

    let out = out.unwrap_or_else(|| derived_out_name(&slugs[0]));
    let work = match work {
        Some(dir) => dir,
        None => std::env::temp_dir().join("osm2sdal-work"),
    };
    std::fs::create_dir_all(&work)
        .wrap_err_with(|| format!("failed to create work dir {}", work.display()))?;

    log::debug!("parser engine {:?} requested; built-in reader in use", engine);

    let mut sources = Vec::with_capacity(slugs.len());
    for slug in &slugs {
        let pbf = work.join(format!("{}.osm.pbf", slug.replace('/', "-")));
        ensure!(
            pbf.exists(),
            "missing extract {}; place the pbf in the work directory",
            pbf.display()
        );
        sources.push(PbfSource::from_path(&pbf)?);
    }

    let mut regions: Vec<RegionInput<'_>> = slugs
        .iter()
        .zip(sources.iter_mut())
        .map(|(slug, source)| RegionInput {
            slug: slug.clone(),
            source,
        })
        .collect();

    build_iso(&mut regions, &options, &out)?;
    println!("{}", out.display());
    Ok(())
}

fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(|s| s.as_str())
        .ok_or_else(|| eyre::eyre!("{} requires a value", flag))
}

fn derived_out_name(slug: &str) -> PathBuf {
    let name = slug.split('/').next_back().unwrap_or(slug);
    PathBuf::from(format!("{}.iso", name.replace(['-', '_'], "")))
}

fn print_usage() {
    println!("osm2sdal - build an SDAL navigation ISO from OSM extracts");
    println!();
    println!("Usage: osm2sdal [OPTIONS] <REGION_SLUG>... [OUT_ISO]");
    println!();
    println!("Arguments:");
    println!("  <REGION_SLUG>...     Geofabrik-style slugs, e.g. europe/cyprus");
    println!("  [OUT_ISO]            output path (derived from the first slug otherwise)");
    println!();
    println!("Options:");
    println!("  --out <path>         output ISO path");
    println!("  --work <dir>         work directory holding the .osm.pbf extracts");
    println!("  --format-mode <m>    OEM | SDAL (default: OEM)");
    println!("  --supp-lang <csv>    supplementary languages, e.g. DAN,DUT");
    println!("  --engine <e>         osmium | pyrosm | auto (default: auto)");
    println!("  --verify             re-read and verify the archive before writing");
    println!("  -v, --verbose        debug logging");
    println!("  -h, --help           show this help");
    println!("  -V, --version        show version");
}

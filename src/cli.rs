use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::library::config::{self, LibraryConfig};
use crate::library::index::ContentIndex;
use crate::logging;

/// Steps run in a fixed order: load, scan, save, copy, debug.
#[derive(Debug, Parser)]
#[command(
    name = "imglib",
    version,
    about = "Deduplicate an image library by content hash and archive it by date and event"
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .multiple(true)
        .args(["scan", "load", "save", "copy", "debug"])
))]
pub struct Cli {
    /// Directories to scan for images
    #[arg(long, num_args = 1.., value_name = "DIR")]
    pub scan: Vec<PathBuf>,

    /// Load a previously saved index before scanning
    #[arg(long, value_name = "FILE")]
    pub load: Option<PathBuf>,

    /// Save the index after scanning
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Copy unique images into an archive rooted at DIR
    #[arg(long, value_name = "DIR")]
    pub copy: Option<PathBuf>,

    /// Print a summary of the index and the IMGLIB_* overrides in effect
    #[arg(long)]
    pub debug: bool,

    /// File name suffixes to include (replaces the configured list)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Path substrings to exclude (replaces the configured list)
    #[arg(long, value_name = "SUBSTRING")]
    pub exclude: Vec<String>,

    /// Skip files smaller than BYTES
    #[arg(long, value_name = "BYTES")]
    pub min_size: Option<u64>,

    /// Update the scan progress indicator every N files (0 disables it)
    #[arg(long, value_name = "N")]
    pub progress_every: Option<u64>,

    /// Hide the scan progress indicator
    #[arg(long)]
    pub quiet: bool,

    /// Log filter decisions and per-file hashing
    #[arg(long)]
    pub verbose: bool,

    /// Print command reports as JSON lines
    #[arg(long)]
    pub json: bool,
}

fn apply_overrides(cfg: &mut LibraryConfig, cli: &Cli) {
    if !cli.extensions.is_empty() {
        cfg.scan.extensions = cli.extensions.clone();
    }
    if !cli.exclude.is_empty() {
        cfg.scan.exclude = cli.exclude.clone();
    }
    if let Some(min_size) = cli.min_size {
        cfg.scan.min_size = min_size;
    }
    if let Some(every) = cli.progress_every {
        cfg.scan.progress_every = every;
    }
}

fn emit(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut cfg = config::load_config()?;
    apply_overrides(&mut cfg, &cli);
    config::validate(&cfg)?;

    let mut index = ContentIndex::default();

    if let Some(path) = cli.load.as_deref() {
        emit(&commands::load::run(path, &mut index)?, cli.json)?;
    }
    if !cli.scan.is_empty() {
        let opts = commands::scan::ScanOptions {
            roots: cli.scan.clone(),
            show_progress: !cli.quiet,
        };
        emit(&commands::scan::run(&opts, &cfg.scan, &mut index)?, cli.json)?;
    }
    if let Some(path) = cli.save.as_deref() {
        emit(&commands::save::run(path, &index)?, cli.json)?;
    }
    if let Some(basepath) = cli.copy.as_deref() {
        emit(&commands::copy::run(basepath, &index)?, cli.json)?;
    }
    if cli.debug {
        emit(&commands::inspect::run(&index), cli.json)?;
    }

    Ok(())
}

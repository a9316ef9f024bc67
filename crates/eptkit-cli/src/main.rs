//! eptkit - report and split Amlogic eMMC partition tables
//!
//! The table itself is read by `ampart`; eptkit renders it with gap and
//! overlap markers, or cuts a full eMMC dump into per-partition images.

mod ampart;
mod discover;

use ampart::Ampart;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use eptkit_core::{SnapshotSet, TableReporter, TableSnapshot};
use eptkit_split::{
    DigestAlgorithm, SplitOptions, SplitProgress, Splitter, DEFAULT_CHUNK_SIZE,
    DEFAULT_PROGRESS_INTERVAL,
};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "eptkit")]
#[command(about = "Report and split Amlogic eMMC partition tables", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the partition table with gaps and overlaps
    Report {
        /// Block device or image (default: the auto-discovered eMMC)
        target: Option<PathBuf>,

        #[command(flatten)]
        source: SnapshotSource,

        /// Print the table as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Split a full eMMC dump into one image per partition
    Split {
        /// Full eMMC dump, e.g. taken with dd
        image: PathBuf,

        /// Output directory, must not exist (default: <IMAGE>_split_<timestamp>)
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SnapshotSource,

        /// Digest to compute for each image (md5, sha1, sha256), repeatable
        #[arg(long = "hash")]
        hashes: Vec<DigestAlgorithm>,

        /// Copy chunk size in bytes
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// fsync every image once written
        #[arg(long)]
        sync: bool,

        /// Print copy progress to stderr
        #[arg(long)]
        progress: bool,
    },
}

/// Where the snapshot line comes from
#[derive(Args)]
struct SnapshotSource {
    /// Read `ampart --mode esnapshot` output from a file ('-' for stdin) instead of running ampart
    #[arg(long)]
    snapshot_file: Option<PathBuf>,

    /// ampart executable
    #[arg(long, default_value = "ampart")]
    ampart: PathBuf,

    /// Require the decimal, hex and human dumps and check that they agree
    #[arg(long)]
    check_variants: bool,
}

impl SnapshotSource {
    fn load(&self, target: &Path) -> Result<TableSnapshot> {
        let output = match &self.snapshot_file {
            Some(path) if path.as_os_str() == "-" => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read snapshot from stdin")?;
                text
            }
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read snapshot file {}", path.display()))?,
            None => Ampart::new(&self.ampart)
                .esnapshot(target)
                .with_context(|| format!("Failed to read EPT of {}", target.display()))?,
        };

        if self.check_variants {
            let set = SnapshotSet::from_tool_output(&output)
                .context("Failed to parse EPT snapshot variants")?;
            return Ok(set.canonical().clone());
        }

        TableSnapshot::from_tool_output(&output).context("Failed to parse EPT snapshot")
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.as_str())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Report {
            target,
            source,
            json,
        } => cmd_report(target, &source, json),
        Command::Split {
            image,
            output,
            source,
            hashes,
            chunk_size,
            sync,
            progress,
        } => {
            let options = SplitOptions {
                chunk_size,
                hash_algorithms: hashes,
                sync_writes: sync,
                progress_interval: DEFAULT_PROGRESS_INTERVAL,
            };
            cmd_split(&image, output, &source, options, progress)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn cmd_report(target: Option<PathBuf>, source: &SnapshotSource, json: bool) -> Result<()> {
    let target = match target {
        Some(target) => target,
        None if source.snapshot_file.is_some() => PathBuf::new(),
        None => {
            let emmc = discover::find_emmc(Path::new("/dev"))?;
            tracing::info!("Automatically chosen {} as eMMC", emmc.display());
            emmc
        }
    };

    let snapshot = source.load(&target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        TableReporter::new(std::io::stdout().lock()).report(&snapshot)?;
    }

    Ok(())
}

fn cmd_split(
    image: &Path,
    output: Option<PathBuf>,
    source: &SnapshotSource,
    options: SplitOptions,
    show_progress: bool,
) -> Result<()> {
    let snapshot = source.load(image)?;
    let output = output
        .unwrap_or_else(|| default_output_dir(image, chrono::Local::now().naive_local()));

    let mut dump =
        File::open(image).with_context(|| format!("Failed to open dump {}", image.display()))?;

    println!("Splitting into {}", output.display());
    let mut splitter = Splitter::with_options(options);
    if show_progress {
        splitter = splitter.with_progress(Arc::new(|progress: &SplitProgress<'_>| {
            eprintln!("{}", progress.format());
        }));
    }
    let report = splitter
        .split_to_new_dir(&snapshot, &mut dump, &output)
        .with_context(|| format!("Failed to split {}", image.display()))?;

    for record in &report.records {
        let digests: Vec<String> = record.digests.iter().map(|d| d.to_string()).collect();
        if digests.is_empty() {
            println!("{}", record.path.display());
        } else {
            println!("{} {}", record.path.display(), digests.join(" "));
        }
    }
    tracing::info!(
        "{} partitions, {} bytes in {:.1}s",
        report.records.len(),
        report.total_bytes(),
        report.elapsed.as_secs_f64()
    );

    Ok(())
}

/// `<image>_split_<YYYYmmdd-HHMMSS>`, next to the image
fn default_output_dir(image: &Path, now: NaiveDateTime) -> PathBuf {
    PathBuf::from(format!(
        "{}_split_{}",
        image.display(),
        now.format("%Y%m%d-%H%M%S")
    ))
}

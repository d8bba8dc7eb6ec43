//! CLI tool for building a fixed-depth feature table from LOB snapshots.
//!
//! # Usage
//!
//! ```bash
//! # Ten levels, every snapshot kept
//! cargo run --release --bin extract_features -- \
//!     --data data/BTCUSDT.snapshots.jsonl.zst \
//!     --metadata data/trade_count.json \
//!     --output-dir data_cleaned/
//!
//! # Five levels, only books whose top levels changed
//! cargo run --release --bin extract_features -- \
//!     --data data/BTCUSDT.snapshots.jsonl \
//!     --metadata data/trade_count.json \
//!     --maxlevel 5 --only-changes
//!
//! # Start from a saved JSON config and override fields
//! # (--no-only-changes switches off dedup enabled in the file)
//! cargo run --release --bin extract_features -- \
//!     --config run.json --metadata data/trade_count.json --maxlevel 20 \
//!     --no-only-changes
//! ```

use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgAction, Parser};

use lob_feature_extractor::{
    ExtractionJob, ExtractorConfig, JsonLinesSource, JsonTradeCountLookup, Result,
    TimeDiscretization,
};

/// Command-line arguments. Unset options keep the value from `--config`,
/// or the built-in default.
#[derive(Parser, Debug)]
#[command(
    name = "extract_features",
    about = "Extract a fixed-depth order book feature table from LOB snapshots"
)]
struct Cli {
    /// Snapshot file (JSON lines, optionally .zst compressed)
    #[arg(long = "data")]
    data: Option<PathBuf>,

    /// Volume threshold for a volume bar
    #[arg(long = "volume-threshold")]
    volume_threshold: Option<u64>,

    /// Tick size
    #[arg(long = "ticksize")]
    tick_size: Option<f64>,

    /// Levels per side to keep
    #[arg(long = "maxlevel")]
    max_level: Option<usize>,

    /// Time discretization (volumebar or natural)
    #[arg(long = "time-discretization")]
    time_discretization: Option<TimeDiscretization>,

    /// Fraction of data to read
    #[arg(long = "data-frac")]
    data_frac: Option<f64>,

    /// Keep only snapshots whose top levels changed
    #[arg(long = "only-changes", action = ArgAction::SetTrue)]
    only_changes: bool,

    /// Keep every snapshot, even if `--config` enables only-changes
    #[arg(long = "no-only-changes", action = ArgAction::SetTrue, conflicts_with = "only_changes")]
    no_only_changes: bool,

    /// Output directory for the feature table
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Trade-count metadata (JSON)
    #[arg(long = "metadata")]
    metadata: PathBuf,

    /// Base configuration (JSON)
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

impl Cli {
    fn build_config(&self) -> Result<ExtractorConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractorConfig::from_json_file(path)?,
            None => ExtractorConfig::default(),
        };

        if let Some(data) = &self.data {
            config = config.with_data_path(data);
        }
        if let Some(threshold) = self.volume_threshold {
            config = config.with_volume_threshold(threshold);
        }
        if let Some(tick_size) = self.tick_size {
            config = config.with_tick_size(tick_size);
        }
        if let Some(max_level) = self.max_level {
            config = config.with_max_level(max_level);
        }
        if let Some(mode) = self.time_discretization {
            config = config.with_time_discretization(mode);
        }
        if let Some(frac) = self.data_frac {
            config = config.with_data_frac(frac);
        }
        if self.only_changes {
            config = config.with_only_changes(true);
        } else if self.no_only_changes {
            config = config.with_only_changes(false);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }

        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.build_config()?;
    let lookup = JsonTradeCountLookup::new(&cli.metadata);
    let source = JsonLinesSource::new(&config.data_path);

    let start = Instant::now();
    let summary = ExtractionJob::new(config).run(&lookup, &source)?;
    let elapsed = start.elapsed();

    println!("Extraction Complete!");
    println!("  Instrument: {}", summary.request.instrument);
    println!("  Snapshots seen: {}", summary.stats.snapshots_seen);
    println!("  Rows written: {}", summary.stats.rows_retained);
    println!("  Output: {}", summary.output_path.display());
    println!("  Time: {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        log::error!("Extraction failed: {e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

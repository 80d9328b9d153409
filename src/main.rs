//! CLI entry point for the bus punctuality tool.
//!
//! Provides subcommands for building the punctuality dataset (stop-level
//! schedule deviations) and the speed dataset from collected position
//! snapshots.

use anyhow::{Context, Result};
use bus_punctuality::{
    builder::DatasetBuilder,
    config::{Dataset, PathArgs, RunConfig},
    output::{log_summary, write_punctuality, write_speed},
    parser::{SnapshotDir, load_stop_registry},
    speed::build_speed_dataset,
    timetable::DirectoryTimetables,
};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bus_punctuality")]
#[command(about = "Builds bus punctuality and speed datasets from position snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match vehicle positions to scheduled stops and record the best deviation per stop
    Punctuality {
        #[command(flatten)]
        paths: PathOpts,

        /// Directory with per-line timetables ({line}.json)
        #[arg(short, long)]
        timetables: Option<PathBuf>,

        /// Stop registry JSON file
        #[arg(long)]
        stops: Option<PathBuf>,
    },
    /// Compute vehicle speeds between consecutive snapshots
    Speed {
        #[command(flatten)]
        paths: PathOpts,
    },
}

#[derive(Args)]
struct PathOpts {
    /// Root data directory (defaults to $BUS_DATA_DIR, then the current directory)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Snapshot directory with 0.json, 1.json, ... (defaults to the newest
    /// buses_location_* directory under <data-dir>/buses_location)
    #[arg(short, long)]
    snapshots: Option<PathBuf>,

    /// CSV file to write (derived from the snapshot directory name if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gzip compress the CSV output
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

impl PathOpts {
    fn into_args(self, timetables: Option<PathBuf>, stops: Option<PathBuf>) -> PathArgs {
        PathArgs {
            data_dir: self.data_dir,
            snapshots: self.snapshots,
            timetables,
            stops,
            output: self.output,
            gzip: self.gzip,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bus_punctuality.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_punctuality.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Punctuality {
            paths,
            timetables,
            stops,
        } => {
            let config = RunConfig::resolve(paths.into_args(timetables, stops), Dataset::Punctuality)?;
            punctuality(&config)?;
        }
        Commands::Speed { paths } => {
            let config = RunConfig::resolve(paths.into_args(None, None), Dataset::Speed)?;
            speed(&config)?;
        }
    }

    Ok(())
}

/// Builds the punctuality dataset and writes it to the configured output.
#[tracing::instrument(skip_all, fields(snapshots = %config.snapshots.display()))]
fn punctuality(config: &RunConfig) -> Result<()> {
    let registry = load_stop_registry(&config.stops)
        .with_context(|| format!("loading stop registry {}", config.stops.display()))?;
    info!(stops = registry.len(), "Stop registry loaded");

    let snapshots = SnapshotDir::open(&config.snapshots)?;
    let mut builder = DatasetBuilder::new(registry, DirectoryTimetables::new(&config.timetables));
    let table = builder
        .build(&snapshots)
        .context("building punctuality data")?;

    write_punctuality(&config.output, &table, config.gzip)
        .with_context(|| format!("writing {}", config.output.display()))?;
    log_summary(builder.stats())?;

    Ok(())
}

/// Builds the speed dataset and writes it to the configured output.
#[tracing::instrument(skip_all, fields(snapshots = %config.snapshots.display()))]
fn speed(config: &RunConfig) -> Result<()> {
    let snapshots = SnapshotDir::open(&config.snapshots)?;
    let samples = build_speed_dataset(&snapshots).context("building speed data")?;

    write_speed(&config.output, &samples, config.gzip)
        .with_context(|| format!("writing {}", config.output.display()))?;

    Ok(())
}

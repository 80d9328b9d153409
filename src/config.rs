//! Resolution of input and output paths.
//!
//! Each path comes from an explicit value if given, then from an environment
//! variable, then from a default under the data directory:
//!
//! ```text
//! <data>/buses_location/buses_location_2024-02-15_18-17-37/{0,1,..}.json
//! <data>/bus_stops/lines/{line}.json
//! <data>/bus_stops/bus_stops.json
//! <data>/punctuality_data/punctuality_data_2024-02-15_18-17-37.csv
//! ```

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PunctualityError, Result};

pub const DATA_DIR_ENV: &str = "BUS_DATA_DIR";
pub const TIMETABLES_DIR_ENV: &str = "BUS_TIMETABLES_DIR";
pub const STOPS_FILE_ENV: &str = "BUS_STOPS_FILE";

const SNAPSHOTS_PARENT: &str = "buses_location";
const SNAPSHOTS_PREFIX: &str = "buses_location_";

/// The kind of dataset being produced; decides default output locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Punctuality,
    Speed,
}

impl Dataset {
    fn output_stem(self) -> &'static str {
        match self {
            Dataset::Punctuality => "punctuality_data",
            Dataset::Speed => "speed_data",
        }
    }
}

/// Path overrides as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PathArgs {
    pub data_dir: Option<PathBuf>,
    pub snapshots: Option<PathBuf>,
    pub timetables: Option<PathBuf>,
    pub stops: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub gzip: bool,
}

/// Fully resolved, validated paths for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub snapshots: PathBuf,
    pub timetables: PathBuf,
    pub stops: PathBuf,
    pub output: PathBuf,
    pub gzip: bool,
}

impl RunConfig {
    /// Resolves paths using the process environment.
    pub fn resolve(args: PathArgs, dataset: Dataset) -> Result<Self> {
        Self::resolve_with(args, dataset, |name| std::env::var(name).ok())
    }

    /// Resolves paths, reading environment variables through `env`.
    ///
    /// Inputs must exist. The output's parent directory is created.
    pub fn resolve_with(
        args: PathArgs,
        dataset: Dataset,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let data_dir = args
            .data_dir
            .or_else(|| env(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let snapshots = match args.snapshots {
            Some(path) => path,
            None => latest_snapshot_dir(&data_dir.join(SNAPSHOTS_PARENT))?,
        };
        require_dir(&snapshots, "snapshot directory")?;

        let timetables = args
            .timetables
            .or_else(|| env(TIMETABLES_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join("bus_stops").join("lines"));
        let stops = args
            .stops
            .or_else(|| env(STOPS_FILE_ENV).map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join("bus_stops").join("bus_stops.json"));

        if dataset == Dataset::Punctuality {
            require_dir(&timetables, "timetable directory")?;
            if !stops.is_file() {
                return Err(PunctualityError::Configuration(format!(
                    "stop registry {} does not exist",
                    stops.display()
                )));
            }
        }

        let output = match args.output {
            Some(path) => path,
            None => default_output(&snapshots, dataset, args.gzip)?,
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let config = Self {
            snapshots,
            timetables,
            stops,
            output,
            gzip: args.gzip,
        };
        debug!(?config, "Paths resolved");
        Ok(config)
    }
}

fn require_dir(path: &Path, what: &str) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PunctualityError::Configuration(format!(
            "{what} {} does not exist",
            path.display()
        )))
    }
}

/// The most recent `buses_location_*` directory. Names embed the collection
/// time, so the greatest name is the newest.
pub fn latest_snapshot_dir(parent: &Path) -> Result<PathBuf> {
    require_dir(parent, "snapshot collection directory")?;

    let mut latest: Option<PathBuf> = None;
    for entry in std::fs::read_dir(parent)? {
        let path = entry?.path();
        let is_snapshot_dir = path.is_dir()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SNAPSHOTS_PREFIX));
        if is_snapshot_dir && latest.as_ref().is_none_or(|l| path > *l) {
            latest = Some(path);
        }
    }

    latest.ok_or_else(|| {
        PunctualityError::Configuration(format!(
            "no {SNAPSHOTS_PREFIX}* directory in {}",
            parent.display()
        ))
    })
}

/// `<data>/<stem>/<stem>_<date>_<time>.csv` for a snapshot directory
/// `<data>/buses_location/buses_location_<date>_<time>`.
pub fn default_output(snapshots: &Path, dataset: Dataset, gzip: bool) -> Result<PathBuf> {
    let name = snapshots
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let parts: Vec<&str> = name.rsplitn(3, '_').collect();
    let [time, date, _] = parts.as_slice() else {
        return Err(PunctualityError::Configuration(format!(
            "cannot derive an output name from {}; pass an output path",
            snapshots.display()
        )));
    };

    let data_dir = snapshots
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    let stem = dataset.output_stem();
    let extension = if gzip { "csv.gz" } else { "csv" };

    Ok(data_dir
        .join(stem)
        .join(format!("{stem}_{date}_{time}.{extension}")))
}

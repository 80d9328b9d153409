//! JSON loaders for the upstream file contract.
//!
//! Every loader is strict: a file that cannot be read or does not match the
//! expected shape aborts the run.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PunctualityError, Result};
use crate::model::{LineTimetable, StopRegistry, VehicleFix};

/// Decodes one position snapshot: a JSON array of vehicle fixes.
pub fn parse_snapshot(bytes: &[u8]) -> serde_json::Result<Vec<VehicleFix>> {
    serde_json::from_slice(bytes)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| PunctualityError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "Loaded JSON file");
    Ok(bytes)
}

fn json_error(path: &Path) -> impl FnOnce(serde_json::Error) -> PunctualityError + '_ {
    move |source| PunctualityError::Json {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads and decodes a JSON file, attaching the path to any failure.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(json_error(path))
}

pub fn load_stop_registry(path: &Path) -> Result<StopRegistry> {
    load_json(path)
}

pub fn load_line_timetable(path: &Path) -> Result<LineTimetable> {
    load_json(path)
}

/// A directory of snapshots named `0.json`, `1.json`, ...
///
/// The snapshot count is the number of `.json` files in the directory; every
/// index below it must exist.
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    path: PathBuf,
    count: usize,
}

impl SnapshotDir {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(PunctualityError::Configuration(format!(
                "snapshot directory {} does not exist",
                path.display()
            )));
        }

        let mut count = 0;
        for entry in std::fs::read_dir(&path)? {
            let entry_path = entry?.path();
            if entry_path.is_file() && entry_path.extension().and_then(|e| e.to_str()) == Some("json") {
                count += 1;
            }
        }

        Ok(Self { path, count })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn snapshot_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("{index}.json"))
    }

    /// Loads snapshot `index`.
    pub fn load(&self, index: usize) -> Result<Vec<VehicleFix>> {
        let path = self.snapshot_path(index);
        if !path.exists() {
            return Err(PunctualityError::MissingSnapshot {
                dir: self.path.clone(),
                index,
            });
        }
        let bytes = read_file(&path)?;
        parse_snapshot(&bytes).map_err(json_error(&path))
    }
}

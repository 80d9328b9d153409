//! Instantaneous speed of each vehicle between consecutive snapshots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::error::Result;
use crate::geo::speed;
use crate::model::{RunKey, VehicleFix};
use crate::parser::SnapshotDir;

/// One speed measurement, located at the later of the two fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub line: String,
    pub velocity: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Position of the last fix of each run in a snapshot.
fn last_fix_by_run(fixes: &[VehicleFix]) -> HashMap<RunKey, usize> {
    fixes
        .iter()
        .enumerate()
        .map(|(index, fix)| (fix.run_key(), index))
        .collect()
}

/// Speeds of every run present in both snapshots. Stationary vehicles are
/// left out. Samples follow the order of `current`; when a run reports more
/// than once in a snapshot, its last fix is used.
pub fn speeds_between(previous: &[VehicleFix], current: &[VehicleFix]) -> Vec<SpeedSample> {
    let previous_by_run = last_fix_by_run(previous);
    let current_by_run = last_fix_by_run(current);

    let mut samples = Vec::new();
    for (index, fix) in current.iter().enumerate() {
        let key = fix.run_key();
        if current_by_run[&key] != index {
            continue;
        }
        let Some(&prev_index) = previous_by_run.get(&key) else {
            continue;
        };
        let prev = &previous[prev_index];

        let seconds = (fix.time - prev.time).num_seconds() as f64;
        let velocity = speed(fix.lat, fix.lon, prev.lat, prev.lon, seconds);
        if velocity > 0.0 {
            samples.push(SpeedSample {
                line: fix.line.clone(),
                velocity,
                latitude: fix.lat,
                longitude: fix.lon,
            });
        }
    }

    samples
}

/// Computes speed samples over every pair of consecutive snapshots.
#[tracing::instrument(skip_all, fields(dir = %snapshots.path().display(), count = snapshots.len()))]
pub fn build_speed_dataset(snapshots: &SnapshotDir) -> Result<Vec<SpeedSample>> {
    let mut samples = Vec::new();
    if snapshots.is_empty() {
        return Ok(samples);
    }

    let last = snapshots.len() - 1;
    let mut previous = snapshots.load(0)?;
    for index in 1..snapshots.len() {
        let current = snapshots.load(index)?;
        let found = speeds_between(&previous, &current);
        info!(file = index, last, samples = found.len(), "Snapshot processed");
        samples.extend(found);
        previous = current;
    }

    Ok(samples)
}

//! Keeps one best (minimum-deviation) record per run and stop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matcher::StopMatch;
use crate::model::RunKey;

/// Best observation so far for one (run, stop) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BestRecord {
    pub deviation_secs: u32,
    pub distance_km: f64,
    pub lat: f64,
    pub lon: f64,
}

/// What [`PunctualityTable::observe`] did with an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Inserted,
    Improved,
    Discarded,
}

/// Accumulated punctuality records for a processing run.
///
/// Records are only ever added or replaced by a strictly smaller deviation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunctualityTable {
    runs: BTreeMap<RunKey, BTreeMap<String, BestRecord>>,
}

impl PunctualityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one matched fix into the table.
    pub fn observe(&mut self, key: &RunKey, matched: &StopMatch, lat: f64, lon: f64) -> Observation {
        let record = BestRecord {
            deviation_secs: matched.deviation_secs,
            distance_km: matched.distance_km,
            lat,
            lon,
        };

        let stops = self.runs.entry(key.clone()).or_default();

        match stops.get_mut(&matched.stop_id) {
            None => {
                stops.insert(matched.stop_id.clone(), record);
                Observation::Inserted
            }
            Some(existing) if record.deviation_secs < existing.deviation_secs => {
                *existing = record;
                Observation::Improved
            }
            Some(_) => Observation::Discarded,
        }
    }

    pub fn get(&self, key: &RunKey, stop_id: &str) -> Option<&BestRecord> {
        self.runs.get(key)?.get(stop_id)
    }

    /// Number of (run, stop) records.
    pub fn len(&self) -> usize {
        self.runs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Rows ordered by run key, then stop id.
    pub fn rows(&self) -> impl Iterator<Item = PunctualityRow> + '_ {
        self.runs.iter().flat_map(|(key, stops)| {
            stops.iter().map(move |(stop_id, record)| PunctualityRow {
                vehicle_number: key.vehicle_number.clone(),
                line: key.line.clone(),
                brigade: key.brigade.clone(),
                stop: stop_id.clone(),
                diff_time: record.deviation_secs,
                diff_dist: record.distance_km,
                bus_lat: record.lat,
                bus_lon: record.lon,
            })
        })
    }
}

/// One line of the punctuality dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PunctualityRow {
    pub vehicle_number: String,
    pub line: String,
    pub brigade: String,
    pub stop: String,
    pub diff_time: u32,
    pub diff_dist: f64,
    pub bus_lat: f64,
    pub bus_lon: f64,
}

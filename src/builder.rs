//! Drives a whole processing pass over a snapshot directory.

use tracing::{info, trace};

use crate::error::Result;
use crate::matcher::StopMatcher;
use crate::model::{StopRegistry, VehicleFix, is_tram_line};
use crate::parser::SnapshotDir;
use crate::reducer::{Observation, PunctualityTable};
use crate::stats::ProcessingStats;
use crate::timetable::{TimetableCache, TimetableSource};

/// Folds vehicle fixes into a [`PunctualityTable`].
///
/// Owns the stop registry and the per-line timetable cache for the duration
/// of one run. Snapshots must be fed in index order.
pub struct DatasetBuilder<S> {
    registry: StopRegistry,
    timetables: TimetableCache<S>,
    matcher: StopMatcher,
    stats: ProcessingStats,
}

impl<S: TimetableSource> DatasetBuilder<S> {
    pub fn new(registry: StopRegistry, timetables: S) -> Self {
        Self::with_matcher(registry, timetables, StopMatcher::default())
    }

    pub fn with_matcher(registry: StopRegistry, timetables: S, matcher: StopMatcher) -> Self {
        Self {
            registry,
            timetables: TimetableCache::new(timetables),
            matcher,
            stats: ProcessingStats::default(),
        }
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Processes every snapshot in `snapshots` and returns the finished table.
    ///
    /// Counters from a previous run are reset.
    #[tracing::instrument(skip_all, fields(dir = %snapshots.path().display(), count = snapshots.len()))]
    pub fn build(&mut self, snapshots: &SnapshotDir) -> Result<PunctualityTable> {
        self.stats = ProcessingStats::default();
        let mut table = PunctualityTable::new();
        let last = snapshots.len().saturating_sub(1);

        for index in 0..snapshots.len() {
            let fixes = snapshots.load(index)?;
            self.process_snapshot(&fixes, &mut table)?;
            info!(file = index, last, records = table.len(), "Snapshot processed");
        }

        Ok(table)
    }

    /// Folds one snapshot's fixes into `table`.
    pub fn process_snapshot(&mut self, fixes: &[VehicleFix], table: &mut PunctualityTable) -> Result<()> {
        self.stats.snapshots += 1;
        for fix in fixes {
            self.process_fix(fix, table)?;
        }
        self.stats.timetables_loaded = self.timetables.loaded_lines();
        Ok(())
    }

    fn process_fix(&mut self, fix: &VehicleFix, table: &mut PunctualityTable) -> Result<()> {
        self.stats.fixes += 1;

        if is_tram_line(&fix.line) {
            self.stats.trams_excluded += 1;
            return Ok(());
        }

        let key = fix.run_key();
        let timetable = self.timetables.get(&fix.line)?;

        let Some(schedule) = timetable.brigade(&fix.brigade) else {
            trace!(run = %key, "Brigade not in timetable");
            self.stats.unknown_brigades += 1;
            return Ok(());
        };

        let attempt = self.matcher.evaluate(fix, schedule, &self.registry);
        self.stats.unregistered_stops += attempt.unregistered_stops;
        self.stats.rejected_by_time += attempt.rejected_by_time;

        let Some(matched) = attempt.best else {
            trace!(run = %key, lat = fix.lat, lon = fix.lon, "No stop matched");
            self.stats.unmatched += 1;
            return Ok(());
        };
        self.stats.matched += 1;

        match table.observe(&key, &matched, fix.lat, fix.lon) {
            Observation::Inserted => self.stats.records_inserted += 1,
            Observation::Improved => self.stats.records_improved += 1,
            Observation::Discarded => self.stats.observations_discarded += 1,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PunctualityError;
    use crate::model::{LineTimetable, RunKey, StopLocation};
    use chrono::NaiveDateTime;
    use std::collections::HashMap;

    fn fix(vehicle: &str, line: &str, brigade: &str, lat: f64, lon: f64, time: &str) -> VehicleFix {
        VehicleFix {
            vehicle_number: vehicle.into(),
            line: line.into(),
            brigade: brigade.into(),
            lat,
            lon,
            time: NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").unwrap(),
        }
    }

    fn timetables() -> HashMap<String, LineTimetable> {
        let line_523: LineTimetable = serde_json::from_str(
            r#"{"3": {"1001_01": ["15:30:00", "16:30:00"], "1001_02": ["15:40:00"], "9999_99": ["15:25:00"]}}"#,
        )
        .unwrap();
        let line_7042: LineTimetable =
            serde_json::from_str(r#"{"1": {"1001_01": ["08:00:00"]}}"#).unwrap();

        HashMap::from([("523".to_string(), line_523), ("7042".to_string(), line_7042)])
    }

    fn registry() -> StopRegistry {
        [
            ("1001_01".to_string(), StopLocation { lat: 52.3, lon: 21.2 }),
            ("1001_02".to_string(), StopLocation { lat: 52.31, lon: 21.2 }),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_matched_fix_is_recorded() {
        let mut builder = DatasetBuilder::new(registry(), timetables());
        let mut table = PunctualityTable::new();

        let fixes = [fix("1000", "523", "3", 52.3, 21.2, "2024-02-16 15:25:00")];
        builder.process_snapshot(&fixes, &mut table).unwrap();

        let record = table.get(&RunKey::new("1000", "523", "3"), "1001_01").unwrap();
        assert_eq!(record.deviation_secs, 300);
        assert_eq!(builder.stats().matched, 1);
        assert_eq!(builder.stats().records_inserted, 1);
        // "9999_99" is scheduled but not registered.
        assert_eq!(builder.stats().unregistered_stops, 1);
    }

    #[test]
    fn test_trams_are_excluded_before_timetable_lookup() {
        // No timetable exists for line 42; loading it would be fatal.
        let mut builder = DatasetBuilder::new(registry(), timetables());
        let mut table = PunctualityTable::new();

        let fixes = [fix("1", "042", "1", 52.3, 21.2, "2024-02-16 15:25:00")];
        builder.process_snapshot(&fixes, &mut table).unwrap();

        assert!(table.is_empty());
        assert_eq!(builder.stats().trams_excluded, 1);
        assert_eq!(builder.stats().timetables_loaded, 0);
    }

    #[test]
    fn test_high_numbered_line_is_a_bus() {
        let mut builder = DatasetBuilder::new(registry(), timetables());
        let mut table = PunctualityTable::new();

        let fixes = [fix("7", "7042", "1", 52.3, 21.2, "2024-02-16 08:01:00")];
        builder.process_snapshot(&fixes, &mut table).unwrap();

        assert_eq!(builder.stats().trams_excluded, 0);
        assert_eq!(table.get(&RunKey::new("7", "7042", "1"), "1001_01").unwrap().deviation_secs, 60);
    }

    #[test]
    fn test_unknown_brigade_is_skipped() {
        let mut builder = DatasetBuilder::new(registry(), timetables());
        let mut table = PunctualityTable::new();

        let fixes = [fix("1000", "523", "77", 52.3, 21.2, "2024-02-16 15:25:00")];
        builder.process_snapshot(&fixes, &mut table).unwrap();

        assert!(table.is_empty());
        assert_eq!(builder.stats().unknown_brigades, 1);
    }

    #[test]
    fn test_missing_timetable_is_fatal() {
        let mut builder = DatasetBuilder::new(registry(), timetables());
        let mut table = PunctualityTable::new();

        let fixes = [fix("1000", "180", "3", 52.3, 21.2, "2024-02-16 15:25:00")];
        let err = builder.process_snapshot(&fixes, &mut table).unwrap_err();
        assert!(matches!(err, PunctualityError::MissingTimetable { .. }));
    }

    #[test]
    fn test_best_record_across_snapshots() {
        let mut builder = DatasetBuilder::new(registry(), timetables());
        let mut table = PunctualityTable::new();

        let snapshots = [
            vec![fix("1000", "523", "3", 52.3, 21.2, "2024-02-16 15:23:20")],
            vec![fix("1000", "523", "3", 52.30001, 21.2, "2024-02-16 15:28:00")],
            vec![fix("1000", "523", "3", 52.3, 21.20001, "2024-02-16 15:33:00")],
            vec![fix("1000", "523", "3", 52.0, 21.0, "2024-02-16 15:35:00")],
        ];
        for fixes in &snapshots {
            builder.process_snapshot(fixes, &mut table).unwrap();
        }

        let record = table.get(&RunKey::new("1000", "523", "3"), "1001_01").unwrap();
        assert_eq!(record.deviation_secs, 120);
        assert_eq!(record.lat, 52.30001);

        let stats = builder.stats();
        assert_eq!(stats.snapshots, 4);
        assert_eq!(stats.records_inserted, 1);
        assert_eq!(stats.records_improved, 1);
        assert_eq!(stats.observations_discarded, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.timetables_loaded, 1);
    }
}

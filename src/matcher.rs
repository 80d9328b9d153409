//! Matches a single vehicle fix to the stop it is currently servicing.
//!
//! Candidates are the brigade's scheduled stops that also appear in the stop
//! registry. A candidate is admitted only when it is strictly closer than the
//! best distance so far, starting at [`MatchThresholds::max_distance_km`].
//! An admitted candidate is accepted only if one of its scheduled times lies
//! within [`MatchThresholds::max_deviation_secs`] of the fix. Acceptance
//! tightens the distance bound; rejection leaves it alone, so a closer but
//! implausible stop never displaces a farther plausible one.

use crate::geo::distance;
use crate::model::{BrigadeSchedule, StopRegistry, VehicleFix};

/// Policy knobs for the matcher. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    pub max_distance_km: f64,
    pub max_deviation_secs: u32,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            max_distance_km: 0.01,
            max_deviation_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopMatch {
    pub stop_id: String,
    pub distance_km: f64,
    pub deviation_secs: u32,
}

/// Result of evaluating one fix, with counts of what was skipped on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchAttempt {
    pub best: Option<StopMatch>,
    /// Scheduled stops missing from the registry.
    pub unregistered_stops: usize,
    /// Stops close enough but with no scheduled time near the fix.
    pub rejected_by_time: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StopMatcher {
    thresholds: MatchThresholds,
}

impl StopMatcher {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    pub fn find_closest_stop(
        &self,
        fix: &VehicleFix,
        schedule: &BrigadeSchedule,
        registry: &StopRegistry,
    ) -> Option<StopMatch> {
        self.evaluate(fix, schedule, registry).best
    }

    pub fn evaluate(
        &self,
        fix: &VehicleFix,
        schedule: &BrigadeSchedule,
        registry: &StopRegistry,
    ) -> MatchAttempt {
        let mut attempt = MatchAttempt::default();
        let mut best_distance = self.thresholds.max_distance_km;
        let fix_time = fix.time_of_day();

        for (stop_id, times) in schedule {
            let Some(stop) = registry.get(stop_id) else {
                attempt.unregistered_stops += 1;
                continue;
            };

            let dist = distance(fix.lat, fix.lon, stop.lat, stop.lon);
            if dist >= best_distance {
                continue;
            }

            let deviation = times.iter().map(|t| t.deviation_from(fix_time)).min();
            match deviation {
                Some(deviation) if deviation < self.thresholds.max_deviation_secs => {
                    best_distance = dist;
                    attempt.best = Some(StopMatch {
                        stop_id: stop_id.clone(),
                        distance_km: dist,
                        deviation_secs: deviation,
                    });
                }
                _ => attempt.rejected_by_time += 1,
            }
        }

        attempt
    }
}

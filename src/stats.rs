use serde::Serialize;

/// Counters for one processing pass. Skips are not errors and never appear
/// in the output, so this is the only place they are visible.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub snapshots: usize,
    pub fixes: usize,

    // skipped before matching
    pub trams_excluded: usize,
    pub unknown_brigades: usize,

    // matcher outcomes
    pub matched: usize,
    pub unmatched: usize,
    pub unregistered_stops: usize,
    pub rejected_by_time: usize,

    // reducer outcomes
    pub records_inserted: usize,
    pub records_improved: usize,
    pub observations_discarded: usize,

    pub timetables_loaded: usize,
}

impl ProcessingStats {
    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Fixes that reached the matcher.
    pub fn attempted(&self) -> usize {
        self.matched + self.unmatched
    }

    pub fn match_pct(&self) -> f64 {
        Self::pct(self.matched, self.attempted())
    }

    pub fn tram_pct(&self) -> f64 {
        Self::pct(self.trams_excluded, self.fixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(ProcessingStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(ProcessingStats::pct(50, 100), 50.0);
        assert_eq!(ProcessingStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_match_pct() {
        let stats = ProcessingStats {
            matched: 3,
            unmatched: 1,
            ..Default::default()
        };
        assert_eq!(stats.attempted(), 4);
        assert_eq!(stats.match_pct(), 75.0);
    }

    #[test]
    fn test_tram_pct() {
        let stats = ProcessingStats {
            fixes: 200,
            trams_excluded: 50,
            ..Default::default()
        };
        assert_eq!(stats.tram_pct(), 25.0);
    }
}

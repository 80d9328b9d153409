//! Input records: vehicle fixes, timetables and the stop registry.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timestamp format used by the position snapshots.
pub const FIX_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One timestamped position report for a vehicle, as found in a snapshot file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleFix {
    #[serde(rename = "VehicleNumber")]
    pub vehicle_number: String,
    #[serde(rename = "Lines")]
    pub line: String,
    #[serde(rename = "Brigade")]
    pub brigade: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Time", deserialize_with = "deserialize_fix_time")]
    pub time: NaiveDateTime,
}

impl VehicleFix {
    pub fn run_key(&self) -> RunKey {
        RunKey::new(&self.vehicle_number, &self.line, &self.brigade)
    }

    /// Wall-clock time of the fix with the date dropped.
    pub fn time_of_day(&self) -> NaiveTime {
        self.time.time()
    }
}

fn deserialize_fix_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, FIX_TIME_FORMAT)
        .map_err(|e| serde::de::Error::custom(format!("invalid fix time {raw:?}: {e}")))
}

/// Identifies one scheduled run: (vehicle, line, brigade).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey {
    pub vehicle_number: String,
    pub line: String,
    pub brigade: String,
}

impl RunKey {
    pub fn new(vehicle_number: &str, line: &str, brigade: &str) -> Self {
        Self {
            vehicle_number: vehicle_number.to_string(),
            line: line.to_string(),
            brigade: brigade.to_string(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.vehicle_number, self.line, self.brigade)
    }
}

/// Trams share the position feed with buses. Lines numbered below 100 are
/// trams, except identifiers sorting at or above `"999"` as strings.
///
/// Identifiers that are not numbers are kept as buses.
pub fn is_tram_line(line: &str) -> bool {
    if line >= "999" {
        return false;
    }
    match line.parse::<u32>() {
        Ok(number) => number < 100,
        Err(_) => false,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid scheduled time {0:?}")]
pub struct ParseScheduleTimeError(pub String);

/// A scheduled time folded into the service day, in seconds since midnight.
///
/// Hours of 24 and above continue the previous service day past midnight and
/// are normalized by subtracting 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleTime(u32);

impl ScheduleTime {
    pub fn seconds_of_day(self) -> u32 {
        self.0
    }

    /// Absolute difference in seconds against a time of day.
    ///
    /// There is no wrap across midnight: `24:00:05` against 23:59:50 is
    /// 86385 s, not 15 s.
    pub fn deviation_from(self, time_of_day: NaiveTime) -> u32 {
        self.0.abs_diff(time_of_day.num_seconds_from_midnight())
    }
}

impl FromStr for ScheduleTime {
    type Err = ParseScheduleTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseScheduleTimeError(s.to_string());

        let mut parts = s.split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let hours: u32 = h.parse().map_err(|_| invalid())?;
        let minutes: u32 = m.parse().map_err(|_| invalid())?;
        let seconds: u32 = sec.parse().map_err(|_| invalid())?;
        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        let hours = if hours >= 24 { hours - 24 } else { hours };
        if hours >= 24 {
            return Err(invalid());
        }
        let total = hours * 3600 + minutes * 60 + seconds;

        Ok(ScheduleTime(total))
    }
}

impl<'de> Deserialize<'de> for ScheduleTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Scheduled times per stop for one brigade. Ordered by stop id so candidate
/// evaluation is deterministic.
pub type BrigadeSchedule = BTreeMap<String, Vec<ScheduleTime>>;

/// Timetable of one line: brigade id → stop id → scheduled times.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct LineTimetable {
    pub brigades: HashMap<String, BrigadeSchedule>,
}

impl LineTimetable {
    pub fn brigade(&self, brigade: &str) -> Option<&BrigadeSchedule> {
        self.brigades.get(brigade)
    }
}

/// Location of one stop post. Other registry fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StopLocation {
    #[serde(rename = "szer_geo", deserialize_with = "deserialize_coordinate")]
    pub lat: f64,
    #[serde(rename = "dlug_geo", deserialize_with = "deserialize_coordinate")]
    pub lon: f64,
}

/// The upstream registry stores coordinates as strings; fixtures use numbers.
fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Number(f64),
        Text(String),
    }

    match Coordinate::deserialize(deserializer)? {
        Coordinate::Number(value) => Ok(value),
        Coordinate::Text(raw) => raw
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate {raw:?}"))),
    }
}

/// Stop id → location.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StopRegistry {
    pub stops: HashMap<String, StopLocation>,
}

impl StopRegistry {
    pub fn get(&self, stop_id: &str) -> Option<&StopLocation> {
        self.stops.get(stop_id)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

impl FromIterator<(String, StopLocation)> for StopRegistry {
    fn from_iter<I: IntoIterator<Item = (String, StopLocation)>>(iter: I) -> Self {
        Self {
            stops: iter.into_iter().collect(),
        }
    }
}

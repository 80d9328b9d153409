//! Per-line timetable loading and caching.
//!
//! [`TimetableSource`] is where timetables come from. [`DirectoryTimetables`]
//! reads `{line}.json` files. [`TimetableCache`] loads each line on first use
//! and keeps it for the rest of the run.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{PunctualityError, Result};
use crate::model::LineTimetable;
use crate::parser::load_line_timetable;

/// Supplies the timetable of one line.
pub trait TimetableSource {
    fn load(&self, line: &str) -> Result<LineTimetable>;
}

/// Reads timetables from a directory of `{line}.json` files.
#[derive(Debug, Clone)]
pub struct DirectoryTimetables {
    dir: PathBuf,
}

impl DirectoryTimetables {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TimetableSource for DirectoryTimetables {
    fn load(&self, line: &str) -> Result<LineTimetable> {
        let path = self.dir.join(format!("{line}.json"));
        if !path.exists() {
            return Err(PunctualityError::MissingTimetable {
                line: line.to_string(),
                path,
            });
        }
        load_line_timetable(&path)
    }
}

/// In-memory timetables, mostly for tests and callers that fetched the
/// schedules themselves.
impl TimetableSource for HashMap<String, LineTimetable> {
    fn load(&self, line: &str) -> Result<LineTimetable> {
        self.get(line)
            .cloned()
            .ok_or_else(|| PunctualityError::MissingTimetable {
                line: line.to_string(),
                path: PathBuf::from(format!("{line}.json")),
            })
    }
}

/// Lazily populated line → timetable map. Entries are never evicted.
pub struct TimetableCache<S> {
    source: S,
    lines: HashMap<String, LineTimetable>,
}

impl<S: TimetableSource> TimetableCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            lines: HashMap::new(),
        }
    }

    /// Returns the line's timetable, loading it on first request.
    pub fn get(&mut self, line: &str) -> Result<&LineTimetable> {
        if !self.lines.contains_key(line) {
            let timetable = self.source.load(line)?;
            debug!(line, brigades = timetable.brigades.len(), "Timetable loaded");
            self.lines.insert(line.to_string(), timetable);
        }
        Ok(&self.lines[line])
    }

    pub fn loaded_lines(&self) -> usize {
        self.lines.len()
    }
}

//! Error type shared by the library.
//!
//! Configuration and data-contract failures are fatal for a whole run.
//! Skip conditions (unknown brigade, unregistered stop, no plausible stop)
//! are not errors; they are counted in [`crate::stats::ProcessingStats`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PunctualityError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Snapshot {index} missing from {}", dir.display())]
    MissingSnapshot { dir: PathBuf, index: usize },
    #[error("No timetable for line {line} at {}", path.display())]
    MissingTimetable { line: String, path: PathBuf },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PunctualityError {
    /// True for failures caused by the input data rather than by the
    /// configuration or the output sink.
    pub fn is_data_contract(&self) -> bool {
        matches!(
            self,
            PunctualityError::Read { .. }
                | PunctualityError::Json { .. }
                | PunctualityError::MissingSnapshot { .. }
                | PunctualityError::MissingTimetable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PunctualityError>;

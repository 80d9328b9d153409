//! CSV persistence for the punctuality and speed datasets.
//!
//! Writers truncate the target file and always emit a header. With `gzip`
//! set, the CSV is gzip-compressed on the way out.

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PunctualityError, Result};
use crate::reducer::{PunctualityRow, PunctualityTable};
use crate::speed::SpeedSample;
use crate::stats::ProcessingStats;

/// Logs run statistics as JSON.
pub fn log_summary(stats: &ProcessingStats) -> Result<()> {
    let json = serde_json::to_string(stats).map_err(|e| PunctualityError::Io(e.into()))?;
    info!(
        match_pct = stats.match_pct(),
        tram_pct = stats.tram_pct(),
        "Run summary {}",
        json
    );
    Ok(())
}

pub const PUNCTUALITY_HEADER: [&str; 8] = [
    "VehicleNumber",
    "Line",
    "Brigade",
    "Stop",
    "DiffTime",
    "DiffDist",
    "BusLat",
    "BusLon",
];

pub const SPEED_HEADER: [&str; 4] = ["line", "velocity", "latitude", "longitude"];

fn write_rows<W: Write, T: Serialize>(
    writer: W,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<W> {
    // The header is written by hand so that empty datasets still carry one.
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(header)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    csv_writer
        .into_inner()
        .map_err(|e| PunctualityError::Io(e.into_error()))
}

fn write_csv<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
    gzip: bool,
) -> Result<()> {
    let file = File::create(path)?;
    debug!(path = %path.display(), gzip, "Writing CSV");

    if gzip {
        let encoder = write_rows(GzEncoder::new(file, Compression::default()), header, rows)?;
        encoder.finish()?;
    } else {
        write_rows(file, header, rows)?;
    }

    Ok(())
}

/// Writes one row per (run, stop) record, ordered by run then stop.
pub fn write_punctuality(path: &Path, table: &PunctualityTable, gzip: bool) -> Result<()> {
    write_csv(path, &PUNCTUALITY_HEADER, table.rows(), gzip)?;
    info!(path = %path.display(), rows = table.len(), "Punctuality data written");
    Ok(())
}

pub fn write_speed(path: &Path, samples: &[SpeedSample], gzip: bool) -> Result<()> {
    write_csv(path, &SPEED_HEADER, samples, gzip)?;
    info!(path = %path.display(), rows = samples.len(), "Speed data written");
    Ok(())
}

/// Loads a plain (uncompressed) punctuality CSV written by [`write_punctuality`].
pub fn read_punctuality(path: &Path) -> Result<Vec<PunctualityRow>> {
    if !path.exists() {
        return Err(PunctualityError::Configuration(format!(
            "punctuality data {} does not exist",
            path.display()
        )));
    }

    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: PunctualityRow = result?;
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::StopMatch;
    use crate::model::RunKey;
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_table() -> PunctualityTable {
        let mut table = PunctualityTable::new();
        let key = RunKey::new("1000", "523", "3");
        let matched = StopMatch {
            stop_id: "1001_01".into(),
            distance_km: 0.0,
            deviation_secs: 300,
        };
        table.observe(&key, &matched, 52.3, 21.2);
        table
    }

    #[test]
    fn test_log_summary_does_not_panic() {
        log_summary(&ProcessingStats::default()).unwrap();
    }

    #[test]
    fn test_write_punctuality_header_and_row() {
        let path = temp_path("bus_punctuality_test_rows.csv");
        let _ = fs::remove_file(&path);

        write_punctuality(&path, &sample_table(), false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "VehicleNumber,Line,Brigade,Stop,DiffTime,DiffDist,BusLat,BusLon",
                "1000,523,3,1001_01,300,0.0,52.3,21.2",
            ]
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_truncates_previous_output() {
        let path = temp_path("bus_punctuality_test_truncate.csv");
        let _ = fs::remove_file(&path);

        write_punctuality(&path, &sample_table(), false).unwrap();
        write_punctuality(&path, &sample_table(), false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_empty_table_has_no_rows() {
        let path = temp_path("bus_punctuality_test_empty.csv");
        let _ = fs::remove_file(&path);

        write_punctuality(&path, &PunctualityTable::new(), false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}\n", PUNCTUALITY_HEADER.join(",")));
        assert!(read_punctuality(&path).unwrap().is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_back_written_rows() {
        let path = temp_path("bus_punctuality_test_read.csv");
        let _ = fs::remove_file(&path);

        let table = sample_table();
        write_punctuality(&path, &table, false).unwrap();

        let rows = read_punctuality(&path).unwrap();
        assert_eq!(rows, table.rows().collect::<Vec<_>>());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_punctuality(&temp_path("bus_punctuality_no_such.csv")).unwrap_err();
        assert!(matches!(err, PunctualityError::Configuration(_)));
    }

    #[test]
    fn test_write_speed_gzip() {
        let path = temp_path("bus_punctuality_test_speed.csv.gz");
        let _ = fs::remove_file(&path);

        let samples = vec![SpeedSample {
            line: "180".into(),
            velocity: 33.5,
            latitude: 52.01,
            longitude: 21.0,
        }];
        write_speed(&path, &samples, true).unwrap();

        let mut decoded = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "line,velocity,latitude,longitude\n180,33.5,52.01,21.0\n");

        fs::remove_file(&path).unwrap();
    }
}

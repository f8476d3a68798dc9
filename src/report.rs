//! CSV report of aggregate records.
//!
//! The column names and order are consumed by downstream tooling and must not
//! change. Timings are written with 3 decimals, speedup with 2.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::error::{BenchError, Result};
use crate::schema::AggregateRecord;

pub const REPORT_HEADER: [&str; 4] = ["benchmark", "optimized_ms", "unoptimized_ms", "speedup"];

/// Renders the full report, header included.
pub fn render_report(records: &[AggregateRecord]) -> Result<Vec<u8>> {
    let mut w = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    w.write_record(REPORT_HEADER)?;
    for r in records {
        w.write_record([
            r.benchmark.clone(),
            format!("{:.3}", r.optimized_ms),
            format!("{:.3}", r.unoptimized_ms),
            format!("{:.2}", r.speedup),
        ])?;
    }
    w.into_inner()
        .map_err(|e| BenchError::Csv(io::Error::new(e.error().kind(), e.to_string()).into()))
}

/// Writes `records` to `destination`, replacing any previous report.
///
/// Missing parent directories are created. Any I/O failure is fatal.
pub fn write_report(records: &[AggregateRecord], destination: &Path) -> Result<()> {
    let write_err = |source| BenchError::ReportWrite {
        path: destination.to_path_buf(),
        source,
    };

    let bytes = render_report(records)?;
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(destination, bytes).map_err(write_err)
}

/// Parses a report produced by [`write_report`].
pub fn read_report(path: &Path) -> Result<Vec<AggregateRecord>> {
    let file = File::open(path).map_err(|source| BenchError::ReportRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::Reader::from_reader(file);

    let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if header != REPORT_HEADER {
        return Err(BenchError::ReportSchema {
            path: path.to_path_buf(),
            found: header,
        });
    }

    rdr.deserialize()
        .map(|row| row.map_err(BenchError::from))
        .collect()
}

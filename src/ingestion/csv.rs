//! CSV loading.

use std::path::Path;

use crate::error::PipelineResult;
use crate::types::{DataSet, Value};

use super::assemble_table;

/// Read a CSV file into an all-text [`DataSet`].
///
/// Rules:
///
/// - The first `skip_rows` physical lines are preamble and are discarded. Blank lines count,
///   so the same value works for a CSV export and for the sheet it came from.
/// - The next non-empty record is the header.
/// - Records may have differing lengths (the World Bank preamble rows are short).
pub fn read_csv_from_path(path: impl AsRef<Path>, skip_rows: usize) -> PipelineResult<DataSet> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    read_csv_from_reader(&path.display().to_string(), &mut rdr, skip_rows)
}

/// Read CSV data from an existing reader. The reader must be built with `has_headers(false)`.
pub fn read_csv_from_reader<R: std::io::Read>(
    source: &str,
    rdr: &mut csv::Reader<R>,
    skip_rows: usize,
) -> PipelineResult<DataSet> {
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // The reader drops blank lines, so skip by line number rather than record count.
        let line = record.position().map(|p| p.line()).unwrap_or(u64::MAX);
        if line <= skip_rows as u64 {
            continue;
        }
        rows.push(record.iter().map(Value::text).collect());
    }
    assemble_table(source, rows, 0)
}

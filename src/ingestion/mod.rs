//! Loader stage: reads a raw table from CSV, Excel or Parquet into an all-text [`DataSet`].
//!
//! Most callers should use [`read_table`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`ReadOptions`])
//! - skips the preamble rows the World Bank puts above the header
//! - loads every cell as trimmed text, leaving type coercion to the normalizer
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`parquet`]
//! - `excel` (requires the `excel` feature)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod parquet;
pub mod unified;

pub use unified::{read_table, ReadOptions, TableFormat};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Schema, Value};

/// Build a table from physical rows.
///
/// The first `skip_rows` rows are discarded, then the first non-empty row becomes the header.
/// Remaining rows are padded (or truncated) to the header width; fully empty rows are dropped.
pub(crate) fn assemble_table<I>(source: &str, rows: I, skip_rows: usize) -> PipelineResult<DataSet>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut rows = rows
        .into_iter()
        .skip(skip_rows)
        .skip_while(|row| row.iter().all(Value::is_null));

    let header_row = rows.next().ok_or_else(|| {
        PipelineError::schema(format!(
            "{source}: no header row found after skipping {skip_rows} row(s)"
        ))
    })?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|v| v.as_str().unwrap_or_default().to_owned())
        .collect();
    let width = headers.len();

    let body: Vec<Vec<Value>> = rows
        .filter(|row| !row.iter().all(Value::is_null))
        .map(|mut row| {
            row.resize(width, Value::Null);
            row
        })
        .collect();

    tracing::debug!(source, columns = width, rows = body.len(), "assembled table");
    Ok(DataSet::new(Schema::utf8(headers), body))
}

#[cfg(test)]
mod tests {
    use super::assemble_table;
    use crate::types::Value;

    fn row(cells: &[&str]) -> Vec<Value> {
        cells.iter().map(|c| Value::text(c)).collect()
    }

    #[test]
    fn skips_preamble_and_blank_rows_before_header() {
        let rows = vec![
            row(&["Data Source", "World Development Indicators"]),
            row(&["Last Updated Date", "2024-06-28"]),
            row(&[""]),
            row(&[""]),
            row(&["Country Name", "Country Code", "1990"]),
            row(&["France", "FRA", "350000000"]),
        ];
        let ds = assemble_table("test", rows, 3).unwrap();
        assert_eq!(
            ds.schema.field_names().collect::<Vec<_>>(),
            vec!["Country Name", "Country Code", "1990"]
        );
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn pads_ragged_rows_and_drops_empty_ones() {
        let rows = vec![
            row(&["a", "b", "c"]),
            row(&["1"]),
            row(&["", "", ""]),
            row(&["2", "3", "4", "extra"]),
        ];
        let ds = assemble_table("test", rows, 0).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows[0], vec![Value::text("1"), Value::Null, Value::Null]);
        assert_eq!(ds.rows[1].len(), 3);
    }

    #[test]
    fn errors_when_only_preamble_is_present() {
        let rows = vec![row(&["Data Source"]), row(&["Last Updated Date"])];
        let err = assemble_table("wide.csv", rows, 3).unwrap_err();
        assert!(err.to_string().contains("no header row found"));
    }
}

//! Unified loading entrypoint.
//!
//! - If [`ReadOptions::format`] is `None`, the format is inferred from the file extension.
//! - Excel sheet selection and preamble skipping are controlled by [`ReadOptions`].

use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::DataSet;

use super::{csv, parquet};

/// Source file formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// The World Bank CSV export.
    Csv,
    /// The `.xls`/`.xlsx` workbook download (or `.ods`). Needs the `excel` feature.
    Excel,
    /// A previously written fact table, or any flat Parquet file.
    Parquet,
}

impl TableFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }
}

/// Options controlling how a table is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// `None` picks the format from the file extension.
    pub format: Option<TableFormat>,
    /// Worksheet name for Excel inputs; `None` picks the first sheet.
    pub sheet: Option<String>,
    /// Number of physical rows above the header to discard (ignored for Parquet).
    pub skip_rows: usize,
}

/// Read a table from `path` into an all-text [`DataSet`].
///
/// # Examples
///
/// ```no_run
/// use co2_emissions_tidy::ingestion::{read_table, ReadOptions};
///
/// # fn main() -> Result<(), co2_emissions_tidy::PipelineError> {
/// let opts = ReadOptions {
///     skip_rows: 3,
///     ..Default::default()
/// };
/// let wide = read_table("API_EN.ATM.CO2E.KT.csv", &opts)?;
/// println!("rows={}", wide.row_count());
/// # Ok(())
/// # }
/// ```
pub fn read_table(path: impl AsRef<Path>, options: &ReadOptions) -> PipelineResult<DataSet> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };
    tracing::debug!(path = %path.display(), format = ?fmt, skip_rows = options.skip_rows, "reading table");

    match fmt {
        TableFormat::Csv => csv::read_csv_from_path(path, options.skip_rows),
        TableFormat::Parquet => parquet::read_parquet_from_path(path),
        TableFormat::Excel => read_excel_dispatch(path, options),
    }
}

pub(crate) fn infer_format_from_path(path: &Path) -> PipelineResult<TableFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            PipelineError::schema(format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ))
        })?;

    TableFormat::from_extension(ext).ok_or_else(|| {
        PipelineError::schema(format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ))
    })
}

fn read_excel_dispatch(path: &Path, options: &ReadOptions) -> PipelineResult<DataSet> {
    #[cfg(feature = "excel")]
    {
        super::excel::read_excel_from_path(path, options.sheet.as_deref(), options.skip_rows)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, options);
        Err(PipelineError::schema(
            "excel input not enabled (enable cargo feature 'excel')",
        ))
    }
}

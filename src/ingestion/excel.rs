#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Value};

use super::assemble_table;

/// Read one worksheet of an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) into an all-text
/// [`DataSet`].
///
/// - `sheet_name` selects the worksheet (`"Data"`, `"Metadata - Countries"`); `None` takes the first
/// - Skips the first `skip_rows` sheet rows (counted from row 1, not from the used range)
/// - Detects the next non-empty row as the header row
/// - Renders every cell as text; numeric cells use their shortest decimal form
pub fn read_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    skip_rows: usize,
) -> PipelineResult<DataSet> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::schema("workbook has no sheets"))?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    let source = format!("{}:{sheet}", path.display());
    read_sheet_range(&source, &range, skip_rows)
}

fn read_sheet_range(
    source: &str,
    range: &calamine::Range<Data>,
    skip_rows: usize,
) -> PipelineResult<DataSet> {
    // The range starts at the first used cell, so leading blank rows are not in it.
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let first_col = range.start().map(|(_, c)| c as usize).unwrap_or(0);

    let rows = range.rows().map(|row| {
        let mut cells = vec![Value::Null; first_col];
        cells.extend(row.iter().map(cell_to_value));
        cells
    });

    assemble_table(source, rows, skip_rows.saturating_sub(first_row))
}

fn cell_to_value(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::text(s),
        other => Value::text(&cell_to_string(other)),
    }
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Year headers are stored as floats (1990.0); keep them integral.
            if f.fract() == 0.0 && f.abs() < 1e15 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::cell_to_string;
    use calamine::Data;

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(cell_to_string(&Data::Float(1990.0)), "1990");
        assert_eq!(cell_to_string(&Data::Float(350000000.0)), "350000000");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
    }
}

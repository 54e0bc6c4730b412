//! Parquet loading.

use std::path::Path;

use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::PipelineResult;
use crate::types::{DataSet, Schema, Value};

/// Read a Parquet file into an all-text [`DataSet`].
///
/// Notes:
/// - Headers are the Parquet leaf column paths, in file schema order
/// - Parquet has no preamble rows, so there is nothing to skip
/// - Uses the Parquet record API (`RowIter`); tables here are small
pub fn read_parquet_from_path(path: impl AsRef<Path>) -> PipelineResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;
    let headers = parquet_leaf_column_paths(&reader);

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for row_res in reader.into_iter() {
        let row = row_res?;
        let mut out_row = vec![Value::Null; headers.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(idx) = headers.iter().position(|h| h == name) {
                out_row[idx] = field_to_value(field);
            }
        }
        rows.push(out_row);
    }

    Ok(DataSet::new(Schema::utf8(headers), rows))
}

fn parquet_leaf_column_paths<R: ChunkReader + 'static>(reader: &SerializedFileReader<R>) -> Vec<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect()
}

fn field_to_value(f: &Field) -> Value {
    match f {
        Field::Null => Value::Null,
        Field::Str(s) => Value::text(s),
        Field::Double(v) => Value::Utf8(v.to_string()),
        Field::Float(v) => Value::Utf8(v.to_string()),
        Field::Long(v) => Value::Utf8(v.to_string()),
        Field::Int(v) => Value::Utf8(v.to_string()),
        other => Value::text(&other.to_string()),
    }
}

//! Wide → long reshaping for [`crate::types::DataSet`].

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Unpivot `value_columns` into (`var_name`, `value_name`) pairs.
///
/// - Emits one row per (input row, value column) pair, in row order then column order.
/// - Output columns are `id_columns` (types preserved), then `var_name` (`Utf8`, holding the
///   source column label), then `value_name` (the cell, typed like the value columns).
/// - Columns that are neither id nor value columns are dropped.
///
/// Output row count is always `row_count * value_columns.len()`.
///
/// Returns [`PipelineError::SchemaMismatch`] if a named column is missing or the value columns
/// do not share a single [`DataType`].
pub fn melt(
    dataset: &DataSet,
    id_columns: &[&str],
    value_columns: &[&str],
    var_name: &str,
    value_name: &str,
) -> PipelineResult<DataSet> {
    let id_idxs = id_columns
        .iter()
        .map(|c| dataset.schema.require(c))
        .collect::<PipelineResult<Vec<_>>>()?;
    let value_idxs = value_columns
        .iter()
        .map(|c| dataset.schema.require(c))
        .collect::<PipelineResult<Vec<_>>>()?;

    let value_type = match value_idxs.first() {
        Some(&first) => {
            let t = dataset.schema.fields[first].data_type;
            if let Some(&odd) = value_idxs
                .iter()
                .find(|&&i| dataset.schema.fields[i].data_type != t)
            {
                return Err(PipelineError::schema(format!(
                    "cannot melt mixed value types: '{}' is {:?}, '{}' is {:?}",
                    dataset.schema.fields[first].name,
                    t,
                    dataset.schema.fields[odd].name,
                    dataset.schema.fields[odd].data_type
                )));
            }
            t
        }
        None => DataType::Utf8,
    };

    let mut fields: Vec<Field> = id_idxs
        .iter()
        .map(|&i| dataset.schema.fields[i].clone())
        .collect();
    fields.push(Field::new(var_name, DataType::Utf8));
    fields.push(Field::new(value_name, value_type));

    let mut rows = Vec::with_capacity(dataset.row_count() * value_idxs.len());
    for row in &dataset.rows {
        let ids: Vec<Value> = id_idxs
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        for (&col, label) in value_idxs.iter().zip(value_columns) {
            let mut out = Vec::with_capacity(ids.len() + 2);
            out.extend(ids.iter().cloned());
            out.push(Value::Utf8((*label).to_owned()));
            out.push(row.get(col).cloned().unwrap_or(Value::Null));
            rows.push(out);
        }
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

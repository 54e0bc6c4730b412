//! Core in-memory table types.
//!
//! Every pipeline stage consumes and produces a [`DataSet`]: an ordered [`Schema`] of typed
//! [`Field`]s plus row-major [`Value`] storage. Stages never mutate their input.

use crate::error::{PipelineError, PipelineResult};

/// Column type. Loaded tables are text; the normalizer assigns the numeric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Whole numbers such as `Year`.
    Int64,
    /// Measures such as `CO2_Emissions_MT`.
    Float64,
    /// Text, including raw cells not yet coerced.
    Utf8,
}

/// One column of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Header label as it appears in the source.
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Column layout of a [`DataSet`], in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Build an all-`Utf8` schema from header labels.
    pub fn utf8(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(
            headers
                .into_iter()
                .map(|h| Field::new(h, DataType::Utf8))
                .collect(),
        )
    }

    /// Header labels, left to right.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Position of the column labelled `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Like [`Schema::index_of`], but a missing column is a [`PipelineError::SchemaMismatch`].
    pub fn require(&self, name: &str) -> PipelineResult<usize> {
        self.index_of(name).ok_or_else(|| {
            PipelineError::schema(format!(
                "missing required column '{name}'. headers={:?}",
                self.field_names().collect::<Vec<_>>()
            ))
        })
    }
}

/// One cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Blank, placeholder or unparseable.
    Null,
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Value {
    /// Build a text value, mapping blank text to [`Value::Null`].
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Null
        } else {
            Value::Utf8(trimmed.to_owned())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

/// A whole table held in memory. Each row has one [`Value`] per [`Schema`] column.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    pub schema: Schema,
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Body rows, header excluded.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Copy of the rows for which `predicate` holds, under the same schema.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_text_trims_and_nulls_blank_cells() {
        assert_eq!(Value::text("  FRA "), Value::Utf8("FRA".to_string()));
        assert_eq!(Value::text("   "), Value::Null);
        assert_eq!(Value::text(""), Value::Null);
    }

    #[test]
    fn require_reports_headers_on_missing_column() {
        let schema = Schema::utf8(["Country Code", "Country Name"]);
        assert_eq!(schema.require("Country Name").unwrap(), 1);

        let msg = schema.require("Region").unwrap_err().to_string();
        assert!(msg.contains("schema mismatch"));
        assert!(msg.contains("missing required column 'Region'"));
        assert!(msg.contains("Country Code"));
    }
}

//! Type coercion for raw text columns.
//!
//! Coercion is total: every row in produces exactly one row out, and a cell that cannot be
//! represented in the target type becomes [`Value::Null`] instead of an error.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::PipelineResult;
use crate::types::{DataSet, DataType, Value};

/// Tokens that mean "not reported" in the source and map to a missing value quietly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValues {
    tokens: Vec<String>,
}

impl MissingValues {
    pub fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_placeholder(&self, raw: &str) -> bool {
        let raw = raw.trim();
        self.tokens.iter().any(|t| t == raw)
    }
}

impl Default for MissingValues {
    /// The World Bank's `..` placeholder.
    fn default() -> Self {
        Self::new([".."])
    }
}

/// Per-run counts of cells that degraded to [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoercionStats {
    /// Cells that were empty in the source.
    pub blank: usize,
    /// Cells holding a known placeholder token.
    pub placeholders: usize,
    /// Cells holding text that is neither a number nor a placeholder.
    pub unparseable: usize,
    /// Up to a handful of distinct unparseable samples, per column, for diagnostics.
    pub unparseable_samples: BTreeMap<String, Vec<String>>,
}

const MAX_SAMPLES: usize = 5;

impl CoercionStats {
    fn record_unparseable(&mut self, column: &str, raw: &str) {
        self.unparseable += 1;
        let samples = self.unparseable_samples.entry(column.to_owned()).or_default();
        if samples.len() < MAX_SAMPLES && !samples.iter().any(|s| s == raw) {
            samples.push(raw.to_owned());
        }
    }
}

/// Coerce the named columns to the given types; other columns pass through unchanged.
///
/// Rules:
///
/// - `Int64`: integer text, or integral float text such as `1990.0`.
/// - `Float64`: finite float text. `NaN` and infinities are treated as missing.
/// - `Utf8`: any value rendered as text.
/// - Blank cells, placeholder tokens and unparseable text all become [`Value::Null`].
///
/// Only a missing column name is an error.
pub fn coerce_columns(
    dataset: &DataSet,
    targets: &[(&str, DataType)],
    missing: &MissingValues,
) -> PipelineResult<(DataSet, CoercionStats)> {
    let mut schema = dataset.schema.clone();
    let mut plan = Vec::with_capacity(targets.len());
    for &(name, data_type) in targets {
        let idx = schema.require(name)?;
        schema.fields[idx].data_type = data_type;
        plan.push((idx, data_type));
    }

    let mut stats = CoercionStats::default();
    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            let mut out = row.clone();
            for &(idx, data_type) in &plan {
                let column = &dataset.schema.fields[idx].name;
                let cell = out.get(idx).cloned().unwrap_or(Value::Null);
                if let Some(slot) = out.get_mut(idx) {
                    *slot = coerce_value(cell, data_type, column, missing, &mut stats);
                }
            }
            out
        })
        .collect();

    if stats.unparseable > 0 {
        tracing::warn!(
            count = stats.unparseable,
            samples = ?stats.unparseable_samples,
            "non-numeric cells treated as missing"
        );
    }

    Ok((DataSet::new(schema, rows), stats))
}

fn coerce_value(
    cell: Value,
    data_type: DataType,
    column: &str,
    missing: &MissingValues,
    stats: &mut CoercionStats,
) -> Value {
    let raw = match (cell, data_type) {
        (Value::Null, _) => {
            stats.blank += 1;
            return Value::Null;
        }
        (v @ Value::Int64(_), DataType::Int64) | (v @ Value::Float64(_), DataType::Float64) => {
            return v;
        }
        (Value::Int64(v), DataType::Float64) => return Value::Float64(v as f64),
        (Value::Float64(v), DataType::Int64) => {
            return integral(v).map(Value::Int64).unwrap_or(Value::Null);
        }
        (Value::Int64(v), DataType::Utf8) => return Value::Utf8(v.to_string()),
        (Value::Float64(v), DataType::Utf8) => return Value::Utf8(v.to_string()),
        (Value::Utf8(s), _) => s,
    };

    if data_type != DataType::Utf8 && missing.is_placeholder(&raw) {
        stats.placeholders += 1;
        return Value::Null;
    }

    let parsed = match data_type {
        DataType::Int64 => parse_i64(&raw).map(Value::Int64),
        DataType::Float64 => parse_f64(&raw).map(Value::Float64),
        DataType::Utf8 => Some(Value::text(&raw)),
    };
    parsed.unwrap_or_else(|| {
        stats.record_unparseable(column, raw.trim());
        Value::Null
    })
}

fn parse_i64(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| parse_f64(trimmed).and_then(integral))
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn integral(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15).then_some(v as i64)
}

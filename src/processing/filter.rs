//! Row filtering for [`crate::types::DataSet`], including the aggregate exclusion.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::PipelineResult;
use crate::metadata::CountryMetadata;
use crate::types::{DataSet, Value};

/// Returns a new [`DataSet`] containing only rows for which `predicate` returns `true`.
///
/// This is a convenience wrapper around [`DataSet::filter_rows`].
pub fn filter<F>(dataset: &DataSet, predicate: F) -> DataSet
where
    F: FnMut(&[Value]) -> bool,
{
    dataset.filter_rows(predicate)
}

/// What [`retain_real_countries`] removed, and why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionReport {
    /// Number of codes in metadata that qualify as real countries.
    pub real_codes: usize,
    /// Rows removed.
    pub dropped_rows: usize,
    /// Codes present in metadata but not sovereign (blank or aggregate region).
    pub dropped_aggregates: BTreeSet<String>,
    /// Codes with no metadata row at all.
    pub dropped_unknown: BTreeSet<String>,
    /// Rows removed because the code cell was blank.
    pub blank_code_rows: usize,
}

/// Keep only rows whose `code_column` is a real country according to `metadata`.
///
/// Membership is decided solely by the metadata `Region`; codes without a metadata row are
/// dropped (fail-closed). Every dropped code is listed in the returned [`ExclusionReport`].
pub fn retain_real_countries(
    dataset: &DataSet,
    code_column: &str,
    metadata: &CountryMetadata,
    aggregate_label: &str,
) -> PipelineResult<(DataSet, ExclusionReport)> {
    let code_idx = dataset.schema.require(code_column)?;
    let real = metadata.real_country_codes(aggregate_label);

    let mut report = ExclusionReport {
        real_codes: real.len(),
        ..Default::default()
    };

    let kept = filter(dataset, |row| {
        let Some(code) = row.get(code_idx).and_then(Value::as_str) else {
            report.blank_code_rows += 1;
            report.dropped_rows += 1;
            return false;
        };
        if real.contains(code) {
            return true;
        }
        report.dropped_rows += 1;
        if metadata.contains(code) {
            report.dropped_aggregates.insert(code.to_owned());
        } else {
            report.dropped_unknown.insert(code.to_owned());
        }
        false
    });

    if !report.dropped_unknown.is_empty() {
        tracing::warn!(
            codes = ?report.dropped_unknown,
            "codes missing from country metadata were excluded"
        );
    }
    tracing::debug!(aggregates = ?report.dropped_aggregates, "aggregate codes excluded");

    Ok((kept, report))
}

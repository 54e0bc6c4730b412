//! Country metadata: the source of truth for which codes are sovereign countries.
//!
//! A code is a real country iff its metadata row has a non-empty `Region` that is not the
//! aggregate label (`"Aggregates"` by default). The World Bank leaves `Region` blank for
//! aggregates such as `WLD` or `HIC`; some extracts spell it out instead. Both are excluded.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PipelineError, PipelineResult};
use crate::model::{COUNTRY_CODE, COUNTRY_NAME, REGION, TABLE_NAME};
use crate::types::{DataSet, Value};

/// Default `Region` value that marks a non-sovereign grouping.
pub const AGGREGATES_REGION: &str = "Aggregates";

/// Attributes of one metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryInfo {
    pub name: Option<String>,
    pub region: Option<String>,
}

/// Country metadata keyed by ISO-3 `Country Code`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryMetadata {
    entries: BTreeMap<String, CountryInfo>,
}

impl CountryMetadata {
    /// Build metadata from a loaded table.
    ///
    /// Requires `Country Code` and `Region` columns; without `Region` the aggregate exclusion
    /// cannot be honoured, so its absence is fatal. The name is taken from `Country Name`, or
    /// from `TableName` (the World Bank metadata sheet's label) when that is all there is.
    /// Rows with a blank code are ignored. A repeated code is a schema error.
    pub fn from_dataset(dataset: &DataSet) -> PipelineResult<Self> {
        let code_idx = dataset.schema.require(COUNTRY_CODE)?;
        let region_idx = dataset.schema.require(REGION)?;
        let name_idx = dataset
            .schema
            .index_of(COUNTRY_NAME)
            .or_else(|| dataset.schema.index_of(TABLE_NAME));

        let text = |row: &[Value], idx: usize| -> Option<String> {
            row.get(idx).and_then(Value::as_str).map(str::to_owned)
        };

        let mut entries = BTreeMap::new();
        for row in &dataset.rows {
            let Some(code) = text(row, code_idx) else {
                continue;
            };
            let info = CountryInfo {
                name: name_idx.and_then(|i| text(row, i)),
                region: text(row, region_idx),
            };
            match entries.entry(code) {
                Entry::Vacant(slot) => {
                    slot.insert(info);
                }
                Entry::Occupied(slot) => {
                    return Err(PipelineError::schema(format!(
                        "duplicate '{COUNTRY_CODE}' in country metadata: '{}'",
                        slot.key()
                    )));
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, CountryInfo)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&CountryInfo> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Whether `code` is a sovereign country. Codes without metadata are not (fail-closed).
    pub fn is_real_country(&self, code: &str, aggregate_label: &str) -> bool {
        self.get(code)
            .and_then(|info| info.region.as_deref())
            .is_some_and(|region| !region.is_empty() && region != aggregate_label)
    }

    /// All codes that pass [`CountryMetadata::is_real_country`].
    pub fn real_country_codes(&self, aggregate_label: &str) -> BTreeSet<String> {
        self.entries
            .keys()
            .filter(|code| self.is_real_country(code, aggregate_label))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{CountryMetadata, AGGREGATES_REGION};
    use crate::types::{DataSet, Schema, Value};

    fn metadata_table(headers: &[&str], rows: &[&[&str]]) -> DataSet {
        DataSet::new(
            Schema::utf8(headers.iter().copied()),
            rows.iter()
                .map(|r| r.iter().map(|c| Value::text(c)).collect())
                .collect(),
        )
    }

    #[test]
    fn region_decides_sovereignty() {
        let ds = metadata_table(
            &["Country Code", "Region", "TableName"],
            &[
                &["FRA", "Europe & Central Asia", "France"],
                &["WLD", "", "World"],
                &["HIC", "Aggregates", "High income"],
                &["TCD", "Sub-Saharan Africa", "Chad"],
            ],
        );
        let md = CountryMetadata::from_dataset(&ds).unwrap();

        assert_eq!(md.len(), 4);
        assert_eq!(md.get("FRA").unwrap().name.as_deref(), Some("France"));
        assert!(md.is_real_country("FRA", AGGREGATES_REGION));
        assert!(!md.is_real_country("WLD", AGGREGATES_REGION));
        assert!(!md.is_real_country("HIC", AGGREGATES_REGION));
        assert!(!md.is_real_country("XKX", AGGREGATES_REGION));
        assert_eq!(
            md.real_country_codes(AGGREGATES_REGION).into_iter().collect::<Vec<_>>(),
            vec!["FRA".to_string(), "TCD".to_string()]
        );
    }

    #[test]
    fn missing_region_column_is_fatal() {
        let ds = metadata_table(&["Country Code", "IncomeGroup"], &[&["FRA", "High income"]]);
        let err = CountryMetadata::from_dataset(&ds).unwrap_err();
        assert!(err.to_string().contains("missing required column 'Region'"));
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let ds = metadata_table(
            &["Country Code", "Region"],
            &[&["FRA", "Europe & Central Asia"], &["FRA", "Aggregates"]],
        );
        let err = CountryMetadata::from_dataset(&ds).unwrap_err();
        assert!(err.to_string().contains("duplicate 'Country Code'"));
    }

    #[test]
    fn blank_codes_are_skipped() {
        let ds = metadata_table(&["Country Code", "Region"], &[&["", "Europe"], &["FRA", "Europe"]]);
        let md = CountryMetadata::from_dataset(&ds).unwrap();
        assert_eq!(md.len(), 1);
    }
}

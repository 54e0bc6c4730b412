//! The four-stage pipeline: load → reshape → normalize → filter, then write.
//!
//! [`transform`] is the pure core and is what the tests exercise directly. [`Pipeline`] wraps
//! it with loading, writing and observer reporting.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::read_table;
use crate::metadata::CountryMetadata;
use crate::model::{EmissionFact, CO2_EMISSIONS_MT, COUNTRY_CODE, COUNTRY_NAME, YEAR};
use crate::observability::{report_failure, PipelineObserver, Severity, Stage, StageStats, TracingObserver};
use crate::output::write_outputs;
use crate::processing::{coerce_columns, melt, retain_real_countries, CoercionStats, ExclusionReport};
use crate::types::{DataSet, DataType, Schema};

/// Summary of one run, suitable for logging or writing as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Rows in the wide emissions table.
    pub input_rows: usize,
    /// Rows in the country metadata table.
    pub metadata_rows: usize,
    /// Year columns that were reshaped, in source order.
    pub year_columns: Vec<i64>,
    /// Source columns dropped before reshaping (indicator columns, out-of-range years).
    pub ignored_columns: Vec<String>,
    /// Rows after the wide → long reshape (`input_rows * year_columns`).
    pub reshaped_rows: usize,
    pub coercion: CoercionStats,
    pub exclusion: ExclusionReport,
    /// Rows in the final fact table.
    pub fact_rows: usize,
    /// Fact rows whose measure is missing.
    pub missing_measures: usize,
    /// Distinct country codes in the fact table.
    pub countries: usize,
    /// Files written, empty for a dry run.
    pub outputs: Vec<PathBuf>,
}

/// Result of [`transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub facts: Vec<EmissionFact>,
    pub report: PipelineReport,
}

/// Year columns of `schema`: headers that are an integer year within `[first, last]`.
///
/// Returns `(label, year)` pairs in column order. The same year appearing under two headers
/// would break the country-year grain, so it is a schema error.
pub fn select_year_columns(schema: &Schema, first: i64, last: i64) -> PipelineResult<Vec<(String, i64)>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in schema.field_names() {
        let Ok(year) = name.trim().parse::<i64>() else {
            continue;
        };
        if !(first..=last).contains(&year) {
            tracing::debug!(column = name, "year column outside configured range");
            continue;
        }
        if !seen.insert(year) {
            return Err(PipelineError::schema(format!("duplicate year column '{name}'")));
        }
        out.push((name.to_owned(), year));
    }
    Ok(out)
}

/// One fact per (code, year). Runs after the aggregate filter, so a grouping or unknown code
/// repeated in the source is dropped like any other rather than aborting the run.
fn ensure_one_row_per_country_year(facts: &[EmissionFact]) -> PipelineResult<()> {
    let mut seen = HashSet::new();
    for f in facts {
        if !seen.insert((f.country_code.as_str(), f.year)) {
            return Err(PipelineError::schema(format!(
                "'{COUNTRY_CODE}' {} appears in more than one row of the emissions table (year {})",
                f.country_code, f.year
            )));
        }
    }
    Ok(())
}

/// Fill blank `Country Name`s from the metadata name (`Country Name` or `TableName`).
fn backfill_names(facts: &mut [EmissionFact], countries: &CountryMetadata) {
    for f in facts.iter_mut().filter(|f| f.country_name.is_empty()) {
        if let Some(name) = countries.get(&f.country_code).and_then(|info| info.name.as_deref()) {
            f.country_name = name.to_owned();
        }
    }
}

/// Turn a loaded wide emissions table and country metadata into the tidy fact table.
///
/// Pure: reads both tables, returns new facts plus a [`PipelineReport`] (with no outputs).
///
/// Fatal conditions are schema problems only: `Country Name`/`Country Code` or metadata
/// `Region` missing, no year column in range, a repeated year column, or a real country
/// appearing on more than one row. A blank `Country Name` is taken from the metadata.
pub fn transform(wide: &DataSet, metadata: &DataSet, config: &PipelineConfig) -> PipelineResult<TransformOutput> {
    wide.schema.require(COUNTRY_NAME)?;
    wide.schema.require(COUNTRY_CODE)?;
    let countries = CountryMetadata::from_dataset(metadata)?;

    let years = select_year_columns(&wide.schema, config.first_year, config.last_year)?;
    if years.is_empty() {
        return Err(PipelineError::schema(format!(
            "no year columns between {} and {} in emissions table",
            config.first_year, config.last_year
        )));
    }

    let labels: Vec<&str> = years.iter().map(|(label, _)| label.as_str()).collect();
    let ignored_columns: Vec<String> = wide
        .schema
        .field_names()
        .filter(|name| *name != COUNTRY_NAME && *name != COUNTRY_CODE && !labels.contains(name))
        .map(str::to_owned)
        .collect();
    tracing::debug!(years = labels.len(), ignored = ?ignored_columns, "selected year columns");

    let long = melt(wide, &[COUNTRY_NAME, COUNTRY_CODE], &labels, YEAR, CO2_EMISSIONS_MT)?;
    let (typed, coercion) = coerce_columns(
        &long,
        &[(YEAR, DataType::Int64), (CO2_EMISSIONS_MT, DataType::Float64)],
        &config.missing_values(),
    )?;
    let (kept, exclusion) = retain_real_countries(&typed, COUNTRY_CODE, &countries, &config.aggregate_region)?;
    let mut facts = EmissionFact::from_dataset(&kept)?;
    ensure_one_row_per_country_year(&facts)?;
    backfill_names(&mut facts, &countries);

    let report = PipelineReport {
        input_rows: wide.row_count(),
        metadata_rows: metadata.row_count(),
        year_columns: years.iter().map(|(_, y)| *y).collect(),
        ignored_columns,
        reshaped_rows: long.row_count(),
        coercion,
        exclusion,
        fact_rows: facts.len(),
        missing_measures: facts.iter().filter(|f| f.co2_emissions_mt.is_none()).count(),
        countries: facts
            .iter()
            .map(|f| f.country_code.as_str())
            .collect::<HashSet<_>>()
            .len(),
        outputs: Vec::new(),
    };

    Ok(TransformOutput { facts, report })
}

/// A configured pipeline run with an observer attached.
pub struct Pipeline {
    config: PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
    alert_at_or_above: Severity,
}

impl Pipeline {
    /// Create a pipeline that logs through [`TracingObserver`] and alerts on `Critical`.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver),
            alert_at_or_above: Severity::Critical,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Severity threshold at which `on_alert` is invoked.
    pub fn with_alert_threshold(mut self, severity: Severity) -> Self {
        self.alert_at_or_above = severity;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, transform and write all configured outputs.
    pub fn run(&self) -> PipelineResult<PipelineReport> {
        self.observed(true)
    }

    /// Load and transform without writing anything.
    pub fn check(&self) -> PipelineResult<PipelineReport> {
        self.observed(false)
    }

    fn observed(&self, write: bool) -> PipelineResult<PipelineReport> {
        let result = self.execute(write);
        if let Err(e) = &result {
            report_failure(self.observer.as_ref(), e, self.alert_at_or_above);
        }
        result
    }

    fn execute(&self, write: bool) -> PipelineResult<PipelineReport> {
        self.config.validate()?;

        let wide = read_table(&self.config.emissions.path, &self.config.emissions_read_options())?;
        let metadata = read_table(&self.config.metadata.path, &self.config.metadata_read_options())?;
        self.observer.on_stage(
            Stage::Load,
            StageStats {
                rows_in: wide.row_count() + metadata.row_count(),
                rows_out: wide.row_count(),
            },
        );

        let TransformOutput { facts, mut report } = transform(&wide, &metadata, &self.config)?;
        self.emit_transform_stages(&report);

        if write {
            report.outputs = write_outputs(&self.config.output, &facts)?;
            self.observer.on_stage(
                Stage::Write,
                StageStats {
                    rows_in: facts.len(),
                    rows_out: facts.len(),
                },
            );
        }

        tracing::info!(
            facts = report.fact_rows,
            countries = report.countries,
            missing = report.missing_measures,
            dropped_aggregates = report.exclusion.dropped_aggregates.len(),
            dropped_unknown = report.exclusion.dropped_unknown.len(),
            "pipeline finished"
        );
        Ok(report)
    }

    fn emit_transform_stages(&self, report: &PipelineReport) {
        let stages = [
            (Stage::Reshape, report.input_rows, report.reshaped_rows),
            (Stage::Normalize, report.reshaped_rows, report.reshaped_rows),
            (Stage::Filter, report.reshaped_rows, report.fact_rows),
        ];
        for (stage, rows_in, rows_out) in stages {
            self.observer.on_stage(stage, StageStats { rows_in, rows_out });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn table(headers: &[&str], rows: &[&[&str]]) -> DataSet {
        DataSet::new(
            Schema::utf8(headers.iter().copied()),
            rows.iter()
                .map(|r| r.iter().map(|c| Value::text(c)).collect())
                .collect(),
        )
    }

    fn wide() -> DataSet {
        table(
            &["Country Name", "Country Code", "Indicator Name", "Indicator Code", "1959", "1990", "1991"],
            &[
                &["France", "FRA", "CO2 emissions (kt)", "EN.ATM.CO2E.KT", "1", "350000000", ".."],
                &["World", "WLD", "CO2 emissions (kt)", "EN.ATM.CO2E.KT", "1", "20000000000", "21000000000"],
                &["Chad", "TCD", "CO2 emissions (kt)", "EN.ATM.CO2E.KT", "", "150.5", "n/a"],
                &["Kosovo", "XKX", "CO2 emissions (kt)", "EN.ATM.CO2E.KT", "", "8000", "8100"],
            ],
        )
    }

    fn metadata() -> DataSet {
        table(
            &["Country Code", "Region", "IncomeGroup", "TableName"],
            &[
                &["FRA", "Europe & Central Asia", "High income", "France"],
                &["TCD", "Sub-Saharan Africa", "Low income", "Chad"],
                &["WLD", "", "", "World"],
            ],
        )
    }

    #[test]
    fn select_year_columns_respects_range_and_order() {
        let years = select_year_columns(&wide().schema, 1960, 2023).unwrap();
        assert_eq!(
            years,
            vec![("1990".to_string(), 1990), ("1991".to_string(), 1991)]
        );
    }

    #[test]
    fn select_year_columns_rejects_duplicates() {
        let schema = Schema::utf8(["1990", " 1990"]);
        let err = select_year_columns(&schema, 1960, 2023).unwrap_err();
        assert!(err.to_string().contains("duplicate year column"));
    }

    #[test]
    fn transform_produces_tidy_real_country_facts() {
        let out = transform(&wide(), &metadata(), &PipelineConfig::default()).unwrap();

        assert_eq!(
            out.facts[0],
            EmissionFact {
                country_name: "France".to_string(),
                country_code: "FRA".to_string(),
                year: 1990,
                co2_emissions_mt: Some(350000000.0),
            }
        );
        assert_eq!(out.facts[1].co2_emissions_mt, None);
        assert!(out.facts.iter().all(|f| f.country_code != "WLD" && f.country_code != "XKX"));
        assert!(out.facts.iter().all(|f| (1960..=2023).contains(&f.year)));

        let r = &out.report;
        assert_eq!(r.input_rows, 4);
        assert_eq!(r.reshaped_rows, 4 * 2);
        assert_eq!(r.fact_rows, 4);
        assert_eq!(r.countries, 2);
        assert_eq!(r.missing_measures, 2);
        assert_eq!(r.coercion.placeholders, 1);
        assert_eq!(r.coercion.unparseable, 1);
        assert_eq!(r.ignored_columns, vec!["Indicator Name", "Indicator Code", "1959"]);
        assert!(r.exclusion.dropped_aggregates.contains("WLD"));
        assert!(r.exclusion.dropped_unknown.contains("XKX"));
    }

    #[test]
    fn transform_fails_without_region() {
        let md = table(&["Country Code", "IncomeGroup"], &[&["FRA", "High income"]]);
        let err = transform(&wide(), &md, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("'Region'"));
    }

    #[test]
    fn transform_fails_without_year_columns_in_range() {
        let cfg = PipelineConfig {
            first_year: 2000,
            last_year: 2010,
            ..Default::default()
        };
        let err = transform(&wide(), &metadata(), &cfg).unwrap_err();
        assert!(err.to_string().contains("no year columns between 2000 and 2010"));
    }

    #[test]
    fn transform_rejects_repeated_country_rows() {
        let w = table(
            &["Country Name", "Country Code", "1990"],
            &[&["France", "FRA", "1"], &["France", "FRA", "2"]],
        );
        let err = transform(&w, &metadata(), &PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("FRA appears in more than one row"));
    }

    #[test]
    fn repeated_aggregate_or_unknown_rows_are_dropped_not_fatal() {
        let w = table(
            &["Country Name", "Country Code", "1990"],
            &[
                &["France", "FRA", "1"],
                &["World", "WLD", "2"],
                &["World", "WLD", "3"],
                &["Channel Islands", "CHI", "4"],
                &["Channel Islands", "CHI", "5"],
            ],
        );
        let out = transform(&w, &metadata(), &PipelineConfig::default()).unwrap();
        assert_eq!(out.facts.len(), 1);
        assert_eq!(out.report.exclusion.dropped_rows, 4);
    }

    #[test]
    fn blank_country_name_falls_back_to_metadata_name() {
        let w = table(
            &["Country Name", "Country Code", "1990"],
            &[&["", "TCD", "150.5"], &["", "FRA", "1"]],
        );
        let md = table(
            &["Country Code", "Region", "TableName"],
            &[&["TCD", "Sub-Saharan Africa", "Chad"], &["FRA", "Europe & Central Asia", ""]],
        );
        let out = transform(&w, &md, &PipelineConfig::default()).unwrap();
        assert_eq!(out.facts[0].country_name, "Chad");
        // No name anywhere: left blank.
        assert_eq!(out.facts[1].country_name, "");
        assert_eq!(crate::model::dim_country(&out.facts)[1].country_name, "Chad");
    }
}

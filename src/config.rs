//! Pipeline configuration.
//!
//! Every field has a default matching the World Bank `API_EN.ATM.CO2E.KT` download, so a
//! JSON config file only needs the values that differ:
//!
//! ```json
//! {
//!   "emissions": { "path": "API_EN.ATM.CO2E.KT_DS2_en_excel_v2.xls", "sheet": "Data" },
//!   "metadata": { "path": "API_EN.ATM.CO2E.KT_DS2_en_excel_v2.xls", "sheet": "Metadata - Countries" },
//!   "output": { "dir": "out", "dim_country": true }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::{ReadOptions, TableFormat};
use crate::metadata::AGGREGATES_REGION;
use crate::processing::MissingValues;

/// Where one input table comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// If `None`, inferred from the extension of `path`.
    pub format: Option<TableFormat>,
    /// Worksheet for Excel inputs; `None` picks the first sheet.
    pub sheet: Option<String>,
    /// Physical rows above the header row. `None` uses the default for the table's role.
    pub skip_rows: Option<usize>,
}

impl SourceConfig {
    pub fn read_options(&self, default_skip_rows: usize) -> ReadOptions {
        ReadOptions {
            format: self.format,
            sheet: self.sheet.clone(),
            skip_rows: self.skip_rows.unwrap_or(default_skip_rows),
        }
    }
}

/// Preamble rows above the header in the World Bank data sheet.
pub const EMISSIONS_SKIP_ROWS: usize = 3;

/// Which output files to write, and where.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Also write `dim_country.csv`.
    pub dim_country: bool,
    /// Also write `dim_year.csv`.
    pub dim_year: bool,
    /// Also write the fact table as Parquet.
    pub parquet: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            dim_country: false,
            dim_year: false,
            parquet: false,
        }
    }
}

/// Options controlling a pipeline run.
///
/// Use [`Default`] for the World Bank layout and override the paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Wide sheet: one row per country, one column per year.
    pub emissions: SourceConfig,
    /// Country metadata sheet with `Country Code` and `Region`.
    pub metadata: SourceConfig,
    /// Inclusive year-column range to reshape.
    pub first_year: i64,
    pub last_year: i64,
    /// Cell tokens meaning "not reported".
    pub missing_tokens: Vec<String>,
    /// `Region` value that marks a non-sovereign grouping.
    pub aggregate_region: String,
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            emissions: SourceConfig::default(),
            metadata: SourceConfig::default(),
            first_year: 1960,
            last_year: 2023,
            missing_tokens: vec!["..".to_string()],
            aggregate_region: AGGREGATES_REGION.to_string(),
            output: OutputConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(input: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn emissions_read_options(&self) -> ReadOptions {
        self.emissions.read_options(EMISSIONS_SKIP_ROWS)
    }

    pub fn metadata_read_options(&self) -> ReadOptions {
        self.metadata.read_options(0)
    }

    pub fn missing_values(&self) -> MissingValues {
        MissingValues::new(self.missing_tokens.iter().cloned())
    }

    /// Reject configurations that cannot produce a meaningful fact table.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.first_year > self.last_year {
            return Err(PipelineError::Config {
                message: format!(
                    "first_year ({}) is after last_year ({})",
                    self.first_year, self.last_year
                ),
            });
        }
        if self.aggregate_region.trim().is_empty() {
            return Err(PipelineError::Config {
                message: "aggregate_region must not be empty".to_string(),
            });
        }
        for (label, source) in [("emissions", &self.emissions), ("metadata", &self.metadata)] {
            if source.path.as_os_str().is_empty() {
                return Err(PipelineError::Config {
                    message: format!("{label}.path is not set"),
                });
            }
        }
        Ok(())
    }
}

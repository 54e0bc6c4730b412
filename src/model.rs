//! Output rows of the star schema and the column names they are written under.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Value};

pub const COUNTRY_NAME: &str = "Country Name";
pub const COUNTRY_CODE: &str = "Country Code";
pub const REGION: &str = "Region";
pub const TABLE_NAME: &str = "TableName";
pub const YEAR: &str = "Year";
pub const CO2_EMISSIONS_MT: &str = "CO2_Emissions_MT";

/// One country-year observation. The grain of the fact table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionFact {
    #[serde(rename = "Country Name")]
    pub country_name: String,
    #[serde(rename = "Country Code")]
    pub country_code: String,
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "CO2_Emissions_MT")]
    pub co2_emissions_mt: Option<f64>,
}

impl EmissionFact {
    /// Convert a normalized long table (`Country Name`, `Country Code`, `Year`,
    /// `CO2_Emissions_MT`) into typed facts.
    ///
    /// A row without a code or year breaks the grain and is reported as a schema error.
    pub fn from_dataset(dataset: &DataSet) -> PipelineResult<Vec<Self>> {
        let name_idx = dataset.schema.require(COUNTRY_NAME)?;
        let code_idx = dataset.schema.require(COUNTRY_CODE)?;
        let year_idx = dataset.schema.require(YEAR)?;
        let value_idx = dataset.schema.require(CO2_EMISSIONS_MT)?;

        dataset
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| -> PipelineResult<Self> {
                let cell = |idx: usize| row.get(idx).unwrap_or(&Value::Null);
                let country_code = cell(code_idx).as_str().ok_or_else(|| {
                    PipelineError::schema(format!("fact row {} has no '{COUNTRY_CODE}'", i + 1))
                })?;
                let year = cell(year_idx).as_i64().ok_or_else(|| {
                    PipelineError::schema(format!(
                        "fact row {} ({country_code}) has no integer '{YEAR}'",
                        i + 1
                    ))
                })?;
                Ok(Self {
                    country_name: cell(name_idx).as_str().unwrap_or_default().to_owned(),
                    country_code: country_code.to_owned(),
                    year,
                    co2_emissions_mt: cell(value_idx).as_f64(),
                })
            })
            .collect()
    }
}

/// `dim_country` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryDim {
    #[serde(rename = "Country Code")]
    pub country_code: String,
    #[serde(rename = "Country Name")]
    pub country_name: String,
}

/// `dim_year` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearDim {
    #[serde(rename = "Year")]
    pub year: i64,
}

/// Distinct countries in the fact table, sorted by code. The first name seen wins.
pub fn dim_country(facts: &[EmissionFact]) -> Vec<CountryDim> {
    let mut by_code: BTreeMap<&str, &str> = BTreeMap::new();
    for f in facts {
        by_code
            .entry(f.country_code.as_str())
            .or_insert(f.country_name.as_str());
    }
    by_code
        .into_iter()
        .map(|(code, name)| CountryDim {
            country_code: code.to_owned(),
            country_name: name.to_owned(),
        })
        .collect()
}

/// Distinct years in the fact table, ascending.
pub fn dim_year(facts: &[EmissionFact]) -> Vec<YearDim> {
    facts
        .iter()
        .map(|f| f.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|year| YearDim { year })
        .collect()
}

//! `co2-emissions-tidy` reshapes the World Bank CO2 emissions download (one column per year)
//! into a tidy country-year fact table for a BI star schema.
//!
//! The pipeline is four pure stages over in-memory [`types::DataSet`]s:
//!
//! 1. **Load** ([`ingestion::read_table`]): CSV, Excel (feature `excel`) or Parquet, skipping
//!    the preamble rows above the header. Every cell is loaded as text.
//! 2. **Reshape** ([`processing::melt`]): one row per (country, year column).
//! 3. **Normalize** ([`processing::coerce_columns`]): `Year` → integer, measure → float;
//!    placeholders such as `..` become missing values, never errors.
//! 4. **Filter** ([`processing::retain_real_countries`]): keeps only codes whose metadata
//!    `Region` is present and not `"Aggregates"`. Codes with no metadata are dropped.
//!
//! [`pipeline::transform`] chains stages 2-4; [`pipeline::Pipeline`] adds loading, writing
//! ([`output`]) and observer reporting ([`observability`]).
//!
//! ## Quick example
//!
//! ```rust
//! use co2_emissions_tidy::config::PipelineConfig;
//! use co2_emissions_tidy::pipeline::transform;
//! use co2_emissions_tidy::types::{DataSet, Schema, Value};
//!
//! let row = |cells: &[&str]| cells.iter().map(|c| Value::text(c)).collect::<Vec<_>>();
//! let wide = DataSet::new(
//!     Schema::utf8(["Country Name", "Country Code", "1990", "1991"]),
//!     vec![
//!         row(&["France", "FRA", "350000000", ".."]),
//!         row(&["World", "WLD", "20000000000", "21000000000"]),
//!     ],
//! );
//! let metadata = DataSet::new(
//!     Schema::utf8(["Country Code", "Region"]),
//!     vec![row(&["FRA", "Europe & Central Asia"]), row(&["WLD", ""])],
//! );
//!
//! let out = transform(&wide, &metadata, &PipelineConfig::default()).unwrap();
//! assert_eq!(out.facts.len(), 2);
//! assert_eq!(out.facts[0].co2_emissions_mt, Some(350000000.0));
//! assert_eq!(out.facts[1].co2_emissions_mt, None);
//! assert!(out.report.exclusion.dropped_aggregates.contains("WLD"));
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: table loading by format
//! - [`processing`]: melt / coerce / filter
//! - [`metadata`]: country metadata and the sovereignty test
//! - [`model`]: fact and dimension rows
//! - [`pipeline`]: stage wiring and the run report
//! - [`output`]: CSV and Parquet writers
//! - [`config`]: JSON-loadable run configuration
//! - [`observability`]: run observers
//! - [`error`]: the shared error type

pub mod config;
pub mod error;
pub mod ingestion;
pub mod metadata;
pub mod model;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{PipelineError, PipelineResult};

//! In-memory data transformations.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by ingestion.
//! Each function is pure: it borrows its input and returns a new table.
//!
//! - [`melt()`]: wide → long reshaping (one row per id × value column)
//! - [`coerce_columns()`]: total type coercion, degrading bad cells to null
//! - [`filter()`] and [`retain_real_countries()`]: row filtering
//!
//! ## Example: melt → coerce
//!
//! ```rust
//! use co2_emissions_tidy::processing::{coerce_columns, melt, MissingValues};
//! use co2_emissions_tidy::types::{DataSet, DataType, Schema, Value};
//!
//! let wide = DataSet::new(
//!     Schema::utf8(["Country Code", "1990", "1991"]),
//!     vec![vec![Value::text("FRA"), Value::text("350000000"), Value::text("..")]],
//! );
//!
//! let long = melt(&wide, &["Country Code"], &["1990", "1991"], "Year", "CO2").unwrap();
//! assert_eq!(long.row_count(), 2);
//!
//! let (typed, stats) = coerce_columns(
//!     &long,
//!     &[("Year", DataType::Int64), ("CO2", DataType::Float64)],
//!     &MissingValues::default(),
//! )
//! .unwrap();
//! assert_eq!(typed.rows[0][2], Value::Float64(350000000.0));
//! assert_eq!(typed.rows[1][2], Value::Null);
//! assert_eq!(stats.placeholders, 1);
//! ```

pub mod filter;
pub mod melt;
pub mod normalize;

pub use filter::{filter, retain_real_countries, ExclusionReport};
pub use melt::melt;
pub use normalize::{coerce_columns, CoercionStats, MissingValues};

//! Writers for the star-schema tables.
//!
//! CSV output goes through `serde`, so floats use the shortest round-trip text (`350000000.0`)
//! and a missing measure is an empty field. Given the same facts, every writer produces
//! byte-identical files.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type;
use serde::Serialize;

use crate::config::OutputConfig;
use crate::error::PipelineResult;
use crate::model::{
    dim_country, dim_year, EmissionFact, CO2_EMISSIONS_MT, COUNTRY_CODE, COUNTRY_NAME, YEAR,
};

pub const FACT_CSV: &str = "fact_co2_emissions_countries.csv";
pub const FACT_PARQUET: &str = "fact_co2_emissions_countries.parquet";
pub const DIM_COUNTRY_CSV: &str = "dim_country.csv";
pub const DIM_YEAR_CSV: &str = "dim_year.csv";

/// Write `rows` as CSV under the given header row.
///
/// The header is written even when `rows` is empty.
pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, headers: &[&str], rows: &[T]) -> PipelineResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the fact table to `fact_co2_emissions_countries.csv`.
pub fn write_fact_csv(path: impl AsRef<Path>, facts: &[EmissionFact]) -> PipelineResult<()> {
    write_csv(path, &[COUNTRY_NAME, COUNTRY_CODE, YEAR, CO2_EMISSIONS_MT], facts)
}

/// Write the fact table as Parquet with the same four columns.
///
/// The measure column is `OPTIONAL DOUBLE`; missing values are encoded with definition level 0.
pub fn write_fact_parquet(path: impl AsRef<Path>, facts: &[EmissionFact]) -> PipelineResult<()> {
    let schema = Arc::new(fact_parquet_schema()?);
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema, props)?;

    let names: Vec<ByteArray> = facts
        .iter()
        .map(|f| ByteArray::from(f.country_name.as_str()))
        .collect();
    let codes: Vec<ByteArray> = facts
        .iter()
        .map(|f| ByteArray::from(f.country_code.as_str()))
        .collect();
    let years: Vec<i64> = facts.iter().map(|f| f.year).collect();
    let values: Vec<f64> = facts.iter().filter_map(|f| f.co2_emissions_mt).collect();
    let def_levels: Vec<i16> = facts
        .iter()
        .map(|f| i16::from(f.co2_emissions_mt.is_some()))
        .collect();

    let mut rg = writer.next_row_group()?;
    let mut col_idx = 0usize;
    while let Some(mut col) = rg.next_column()? {
        match col_idx {
            0 => {
                col.typed::<ByteArrayType>().write_batch(&names, None, None)?;
            }
            1 => {
                col.typed::<ByteArrayType>().write_batch(&codes, None, None)?;
            }
            2 => {
                col.typed::<Int64Type>().write_batch(&years, None, None)?;
            }
            _ => {
                col.typed::<DoubleType>()
                    .write_batch(&values, Some(def_levels.as_slice()), None)?;
            }
        }
        col.close()?;
        col_idx += 1;
    }
    rg.close()?;
    writer.close()?;
    Ok(())
}

fn fact_parquet_schema() -> PipelineResult<Type> {
    let utf8 = |name: &str| {
        Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
            .with_repetition(Repetition::REQUIRED)
            .with_converted_type(ConvertedType::UTF8)
            .build()
    };
    let fields = vec![
        Arc::new(utf8(COUNTRY_NAME)?),
        Arc::new(utf8(COUNTRY_CODE)?),
        Arc::new(
            Type::primitive_type_builder(YEAR, PhysicalType::INT64)
                .with_repetition(Repetition::REQUIRED)
                .build()?,
        ),
        Arc::new(
            Type::primitive_type_builder(CO2_EMISSIONS_MT, PhysicalType::DOUBLE)
                .with_repetition(Repetition::OPTIONAL)
                .build()?,
        ),
    ];
    Ok(Type::group_type_builder("fact_co2_emissions_countries")
        .with_fields(fields)
        .build()?)
}

/// Write the configured output tables into `config.dir`, returning the paths written.
///
/// The fact CSV is always written; dimension tables and Parquet are opt-in. Every file is
/// first written under a hidden `.partial` name and renamed into place only once all of them
/// succeeded, so a failed run leaves no new outputs behind.
pub fn write_outputs(config: &OutputConfig, facts: &[EmissionFact]) -> PipelineResult<Vec<PathBuf>> {
    fs::create_dir_all(&config.dir)?;

    let mut staged = Vec::new();
    if let Err(e) = write_staged(config, facts, &mut staged) {
        for (tmp, _) in &staged {
            let _ = fs::remove_file(tmp);
        }
        return Err(e);
    }

    let mut written = Vec::with_capacity(staged.len());
    for (tmp, dest) in staged {
        fs::rename(&tmp, &dest)?;
        tracing::info!(path = %dest.display(), "wrote output");
        written.push(dest);
    }
    Ok(written)
}

/// Write each enabled table to its staging path, recording `(staging, final)` pairs before
/// the write starts so a half-written file is cleaned up too.
fn write_staged(
    config: &OutputConfig,
    facts: &[EmissionFact],
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> PipelineResult<()> {
    let mut stage = |name: &str| {
        let dest = config.dir.join(name);
        let tmp = staging_path(&dest);
        staged.push((tmp.clone(), dest));
        tmp
    };

    write_fact_csv(stage(FACT_CSV), facts)?;
    if config.dim_country {
        write_csv(stage(DIM_COUNTRY_CSV), &[COUNTRY_CODE, COUNTRY_NAME], &dim_country(facts))?;
    }
    if config.dim_year {
        write_csv(stage(DIM_YEAR_CSV), &[YEAR], &dim_year(facts))?;
    }
    if config.parquet {
        write_fact_parquet(stage(FACT_PARQUET), facts)?;
    }
    Ok(())
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".partial");
    dest.with_file_name(name)
}

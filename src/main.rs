//! co2-tidy CLI - reshape the World Bank CO2 workbook into a star-schema fact table
//!
//! ```bash
//! co2-tidy run --emissions API_EN.ATM.CO2E.KT.xlsx --emissions-sheet Data \
//!     --metadata API_EN.ATM.CO2E.KT.xlsx --metadata-sheet "Metadata - Countries" \
//!     --out-dir out --dim-country --dim-year
//! co2-tidy check --config co2.json      # load + transform, print report, write nothing
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG=co2_emissions_tidy=debug` for stage detail.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use co2_emissions_tidy::config::{OutputConfig, PipelineConfig};
use co2_emissions_tidy::observability::{CompositeObserver, FileObserver, PipelineObserver, TracingObserver};
use co2_emissions_tidy::pipeline::{Pipeline, PipelineReport};
use co2_emissions_tidy::PipelineResult;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "co2-tidy")]
#[command(about = "Reshape World Bank CO2 emissions into a tidy country-year fact table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, reshape, filter and write the output tables
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Append run events to this log file
        #[arg(long)]
        run_log: Option<PathBuf>,
    },

    /// Load and transform without writing; print the report as JSON
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wide emissions table (.csv, .xlsx, .parquet)
    #[arg(short, long)]
    emissions: Option<PathBuf>,

    /// Worksheet holding the emissions data (default: first sheet)
    #[arg(long)]
    emissions_sheet: Option<String>,

    /// Rows above the emissions header row (default: 3)
    #[arg(long)]
    skip_rows: Option<usize>,

    /// Country metadata table with `Country Code` and `Region`
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Worksheet holding the country metadata (default: first sheet)
    #[arg(long)]
    metadata_sheet: Option<String>,

    /// First year column to keep
    #[arg(long)]
    first_year: Option<i64>,

    /// Last year column to keep
    #[arg(long)]
    last_year: Option<i64>,
}

/// Output selection. Switches only turn outputs on; a config file that enables one keeps it.
#[derive(Args)]
struct OutputArgs {
    /// Output directory (default: current directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Also write dim_country.csv
    #[arg(long)]
    dim_country: bool,

    /// Also write dim_year.csv
    #[arg(long)]
    dim_year: bool,

    /// Also write the fact table as Parquet
    #[arg(long)]
    parquet: bool,
}

impl OutputArgs {
    fn apply(self, output: &mut OutputConfig) {
        if let Some(dir) = self.out_dir {
            output.dir = dir;
        }
        output.dim_country |= self.dim_country;
        output.dim_year |= self.dim_year;
        output.parquet |= self.parquet;
    }
}

impl SourceArgs {
    fn into_config(self) -> PipelineResult<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_json_path(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(path) = self.emissions {
            cfg.emissions.path = path;
        }
        if let Some(sheet) = self.emissions_sheet {
            cfg.emissions.sheet = Some(sheet);
        }
        if let Some(n) = self.skip_rows {
            cfg.emissions.skip_rows = Some(n);
        }
        if let Some(path) = self.metadata {
            cfg.metadata.path = path;
        }
        if let Some(sheet) = self.metadata_sheet {
            cfg.metadata.sheet = Some(sheet);
        }
        if let Some(y) = self.first_year {
            cfg.first_year = y;
        }
        if let Some(y) = self.last_year {
            cfg.last_year = y;
        }
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("co2_emissions_tidy=info,co2_tidy=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    match execute(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "co2-tidy failed");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> PipelineResult<()> {
    match cli.command {
        Commands::Run {
            source,
            output,
            report,
            run_log,
        } => {
            let cfg = run_config(source, output)?;
            let mut pipeline = Pipeline::new(cfg);
            if let Some(log) = run_log {
                let observers: Vec<Arc<dyn PipelineObserver>> =
                    vec![Arc::new(TracingObserver), Arc::new(FileObserver::new(log))];
                pipeline = pipeline.with_observer(Arc::new(CompositeObserver::new(observers)));
            }

            let summary = pipeline.run()?;
            if let Some(path) = report {
                write_report(&path, &summary)?;
            }
        }
        Commands::Check { source } => {
            let summary = Pipeline::new(source.into_config()?).check()?;
            println!("{}", report_json(&summary)?);
        }
    }
    Ok(())
}

/// Config for `run`: the JSON file (if any), then source flags, then output switches.
fn run_config(source: SourceArgs, output: OutputArgs) -> PipelineResult<PipelineConfig> {
    let mut cfg = source.into_config()?;
    output.apply(&mut cfg.output);
    Ok(cfg)
}

fn report_json(report: &PipelineReport) -> PipelineResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn write_report(path: &Path, report: &PipelineReport) -> PipelineResult<()> {
    fs::write(path, report_json(report)?)?;
    tracing::info!(path = %path.display(), "wrote run report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn tmp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("co2-tidy-cli-{nanos}-{name}"))
    }

    fn run_config_from(args: &[&str]) -> PipelineConfig {
        match Cli::try_parse_from(args.iter().copied()).unwrap().command {
            Commands::Run { source, output, .. } => run_config(source, output).unwrap(),
            Commands::Check { .. } => panic!("expected the run subcommand"),
        }
    }

    fn write_config(name: &str) -> PathBuf {
        let path = tmp_path(name);
        let json = serde_json::json!({
            "emissions": { "path": "from_config.csv", "skip_rows": 5 },
            "metadata": { "path": "meta.csv" },
            "last_year": 2020,
            "output": { "dir": "config_out", "dim_country": true }
        });
        fs::write(&path, json.to_string()).unwrap();
        path
    }

    #[test]
    fn flags_override_config_file_values() {
        let config = write_config("override.json");
        let cfg = run_config_from(&[
            "co2-tidy",
            "run",
            "--config",
            config.to_str().unwrap(),
            "--emissions",
            "from_flag.csv",
            "--last-year",
            "2010",
            "--dim-year",
        ]);

        assert_eq!(cfg.emissions.path, PathBuf::from("from_flag.csv"));
        assert_eq!(cfg.emissions.skip_rows, Some(5));
        assert_eq!(cfg.metadata.path, PathBuf::from("meta.csv"));
        assert_eq!((cfg.first_year, cfg.last_year), (1960, 2010));
        assert_eq!(cfg.output.dir, PathBuf::from("config_out"));
        // Switches are OR-merged: the config's dim_country survives an absent flag.
        assert!(cfg.output.dim_country);
        assert!(cfg.output.dim_year);
        assert!(!cfg.output.parquet);

        let _ = fs::remove_file(&config);
    }

    #[test]
    fn skip_rows_and_out_dir_flags_win() {
        let config = write_config("skip.json");
        let cfg = run_config_from(&[
            "co2-tidy",
            "run",
            "-c",
            config.to_str().unwrap(),
            "--skip-rows",
            "2",
            "-o",
            "flag_out",
            "--parquet",
        ]);

        assert_eq!(cfg.emissions.path, PathBuf::from("from_config.csv"));
        assert_eq!(cfg.emissions_read_options().skip_rows, 2);
        assert_eq!(cfg.output.dir, PathBuf::from("flag_out"));
        assert!(cfg.output.parquet);

        let _ = fs::remove_file(&config);
    }

    #[test]
    fn flags_alone_build_a_config() {
        let cfg = run_config_from(&[
            "co2-tidy",
            "run",
            "-e",
            "wide.xlsx",
            "--emissions-sheet",
            "Data",
            "-m",
            "wide.xlsx",
        ]);
        assert_eq!(cfg.emissions.sheet.as_deref(), Some("Data"));
        assert_eq!(cfg.emissions_read_options().skip_rows, 3);
        assert_eq!(cfg.output, OutputConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["co2-tidy", "check", "--config", "does/not/exist.json"]).unwrap();
        let Commands::Check { source } = cli.command else {
            panic!("expected the check subcommand");
        };
        assert!(source.into_config().is_err());
    }

    #[test]
    fn report_is_written_as_pretty_json() {
        let path = tmp_path("report.json");
        let report = PipelineReport {
            fact_rows: 9,
            year_columns: vec![1990, 1991],
            ..Default::default()
        };
        write_report(&path, &report).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["fact_rows"], 9);
        assert_eq!(json["year_columns"], serde_json::json!([1990, 1991]));
        assert!(json["exclusion"]["dropped_unknown"].as_array().unwrap().is_empty());

        let _ = fs::remove_file(&path);
    }
}

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use co2_emissions_tidy::config::PipelineConfig;
use co2_emissions_tidy::observability::{
    CompositeObserver, FileObserver, PipelineObserver, Severity, Stage, StageStats,
};
use co2_emissions_tidy::pipeline::Pipeline;
use co2_emissions_tidy::PipelineError;

#[derive(Default)]
struct RecordingObserver {
    stages: Mutex<Vec<(Stage, StageStats)>>,
    failures: Mutex<Vec<Severity>>,
    alerts: Mutex<Vec<Severity>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_stage(&self, stage: Stage, stats: StageStats) {
        self.stages.lock().unwrap().push((stage, stats));
    }

    fn on_failure(&self, severity: Severity, _error: &PipelineError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, severity: Severity, _error: &PipelineError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn tmp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("co2-emissions-tidy-obs-{name}-{nanos}"))
}

fn config(emissions: &str, metadata: &str) -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.emissions.path = PathBuf::from(emissions);
    cfg.metadata.path = PathBuf::from(metadata);
    cfg
}

#[test]
fn observer_sees_every_stage_on_success() {
    let obs = Arc::new(RecordingObserver::default());
    let mut cfg = config("tests/fixtures/co2_wide.csv", "tests/fixtures/country_metadata.csv");
    cfg.output.dir = tmp_path("ok");

    Pipeline::new(cfg.clone())
        .with_observer(obs.clone())
        .run()
        .unwrap();

    let stages = obs.stages.lock().unwrap().clone();
    let names: Vec<Stage> = stages.iter().map(|(s, _)| *s).collect();
    assert_eq!(
        names,
        vec![Stage::Load, Stage::Reshape, Stage::Normalize, Stage::Filter, Stage::Write]
    );
    assert_eq!(stages[1].1, StageStats { rows_in: 6, rows_out: 18 });
    assert_eq!(stages[3].1, StageStats { rows_in: 18, rows_out: 9 });
    assert!(obs.failures.lock().unwrap().is_empty());

    let _ = fs::remove_dir_all(&cfg.output.dir);
}

#[test]
fn missing_input_file_is_critical_and_alerts() {
    let obs = Arc::new(RecordingObserver::default());
    let cfg = config("tests/fixtures/does_not_exist.csv", "tests/fixtures/country_metadata.csv");

    let _ = Pipeline::new(cfg).with_observer(obs.clone()).check().unwrap_err();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![Severity::Critical]);
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![Severity::Critical]);
}

#[test]
fn schema_mismatch_fails_without_alert_at_default_threshold() {
    let obs = Arc::new(RecordingObserver::default());
    // The wide sheet has no `Region` column, so using it as metadata must fail.
    let cfg = config("tests/fixtures/co2_wide.csv", "tests/fixtures/co2_wide.csv");

    let _ = Pipeline::new(cfg).with_observer(obs.clone()).check().unwrap_err();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![Severity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lower_alert_threshold_alerts_on_schema_mismatch() {
    let obs = Arc::new(RecordingObserver::default());
    let cfg = config("tests/fixtures/co2_wide.csv", "tests/fixtures/co2_wide.csv");

    let _ = Pipeline::new(cfg)
        .with_observer(obs.clone())
        .with_alert_threshold(Severity::Error)
        .check()
        .unwrap_err();

    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![Severity::Error]);
}

#[test]
fn file_observer_appends_run_log_through_composite() {
    let log = tmp_path("run.log");
    let recording = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn PipelineObserver>> =
        vec![Arc::new(FileObserver::new(&log)), recording.clone()];
    let composite = CompositeObserver::new(observers);

    let cfg = config("tests/fixtures/does_not_exist.csv", "tests/fixtures/country_metadata.csv");
    let _ = Pipeline::new(cfg)
        .with_observer(Arc::new(composite))
        .check()
        .unwrap_err();

    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("fail severity=Critical"));
    assert!(text.contains("ALERT severity=Critical"));
    assert_eq!(recording.failures.lock().unwrap().len(), 1);

    let _ = fs::remove_file(&log);
}

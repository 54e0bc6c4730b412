//! Run observers: hooks for logging stage completions, failures and alerts.
//!
//! [`crate::pipeline::Pipeline`] reports to a [`PipelineObserver`]. Use [`TracingObserver`] for
//! console logs, [`FileObserver`] for an append-only run log next to the outputs, and
//! [`CompositeObserver`] to fan out to several.

use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PipelineError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (run aborted on bad input).
    Error,
    /// Critical error (I/O or other infrastructure failures).
    Critical,
}

impl Severity {
    /// Classify a pipeline error. I/O problems are `Critical`; everything else is `Error`.
    pub fn of(e: &PipelineError) -> Self {
        match e {
            PipelineError::Io(_) => Severity::Critical,
            PipelineError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Severity::Critical,
                _ => Severity::Error,
            },
            PipelineError::Parquet(err) => {
                if error_chain_contains_io(err) {
                    Severity::Critical
                } else {
                    Severity::Error
                }
            }
            #[cfg(feature = "excel")]
            PipelineError::Excel(calamine::Error::Io(_)) => Severity::Critical,
            #[cfg(feature = "excel")]
            PipelineError::Excel(_) => Severity::Error,
            PipelineError::Json(_)
            | PipelineError::SchemaMismatch { .. }
            | PipelineError::Config { .. } => Severity::Error,
        }
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Reshape,
    Normalize,
    Filter,
    Write,
}

/// Row counts reported when a stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    pub rows_in: usize,
    pub rows_out: usize,
}

/// Observer interface for pipeline runs.
pub trait PipelineObserver: Send + Sync {
    /// Called when a stage completes.
    fn on_stage(&self, _stage: Stage, _stats: StageStats) {}

    /// Called when the run fails.
    fn on_failure(&self, _severity: Severity, _error: &PipelineError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, severity: Severity, error: &PipelineError) {
        self.on_failure(severity, error)
    }
}

/// Report a failure to `observer`, alerting when `severity >= alert_at_or_above`.
pub fn report_failure(observer: &dyn PipelineObserver, error: &PipelineError, alert_at_or_above: Severity) {
    let severity = Severity::of(error);
    observer.on_failure(severity, error);
    if severity >= alert_at_or_above {
        observer.on_alert(severity, error);
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_stage(&self, stage: Stage, stats: StageStats) {
        for o in &self.observers {
            o.on_stage(stage, stats);
        }
    }

    fn on_failure(&self, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(severity, error);
        }
    }

    fn on_alert(&self, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(severity, error);
        }
    }
}

/// Logs run events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_stage(&self, stage: Stage, stats: StageStats) {
        tracing::info!(?stage, rows_in = stats.rows_in, rows_out = stats.rows_out, "stage complete");
    }

    fn on_failure(&self, severity: Severity, error: &PipelineError) {
        tracing::error!(?severity, %error, "pipeline failed");
    }

    fn on_alert(&self, severity: Severity, error: &PipelineError) {
        tracing::error!(?severity, %error, alert = true, "pipeline failed");
    }
}

/// Appends run events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_stage(&self, stage: Stage, stats: StageStats) {
        self.append_line(&format!(
            "{} ok stage={stage:?} rows_in={} rows_out={}",
            unix_ts(),
            stats.rows_in,
            stats.rows_out
        ));
    }

    fn on_failure(&self, severity: Severity, error: &PipelineError) {
        self.append_line(&format!("{} fail severity={severity:?} err={error}", unix_ts()));
    }

    fn on_alert(&self, severity: Severity, error: &PipelineError) {
        self.append_line(&format!("{} ALERT severity={severity:?} err={error}", unix_ts()));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by loading, transforming and writing.
///
/// Cell-level problems (placeholders such as `..`, malformed numbers, unknown country codes)
/// never surface here: they degrade to missing values or excluded rows. Only conditions that
/// make the output untrustworthy abort the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel read error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet read/write error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Config file could not be parsed, or a report could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input does not have the columns the pipeline needs (e.g. `Region` is absent).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The configuration is internally inconsistent.
    #[error("invalid config: {message}")]
    Config { message: String },
}

impl PipelineError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }
}

use std::path::PathBuf;

/// Errors raised while loading input, reading configuration or writing
/// reports. Data-quality problems inside records are never errors; they are
/// normalized to defaults and counted in the aggregation audit instead.
#[derive(Debug, thiserror::Error)]
pub enum SalesMetricsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("unsupported input {0}: expected a .csv or .json file")]
    UnsupportedInput(PathBuf),
}

impl SalesMetricsError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SalesMetricsError>;

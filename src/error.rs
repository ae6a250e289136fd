use std::path::PathBuf;

use thiserror::Error;

/// Result type for the data layer.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised while loading, filtering or comparing datasets.
///
/// Every variant is reported to the page that triggered it and rendered as
/// an inline message; nothing here is retried.
#[derive(Debug, Error)]
pub enum DataError {
    /// The source path does not resolve to a file.
    #[error("data source not found: {}", path.display())]
    DataNotFound { path: PathBuf },

    /// A required column / property is absent from the source.
    #[error("missing required column '{column}' in {source_name}")]
    Schema { column: String, source_name: String },

    /// One side of a comparison lacks a join-key column.
    #[error("merge failed: the {side} data is missing join key '{key}'")]
    MergeKey { side: String, key: String },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// A cell could not be interpreted as the type its column requires.
    #[error("row {row}, column '{column}': {reason}")]
    InvalidValue {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl DataError {
    pub(crate) fn schema(column: &str, source_name: impl Into<String>) -> Self {
        Self::Schema {
            column: column.to_string(),
            source_name: source_name.into(),
        }
    }
}

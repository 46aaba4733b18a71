use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to list station files in '{0}'")]
    FolderRead(PathBuf, #[source] std::io::Error),

    #[error("No '{prefix}*.csv' station files found in '{folder}'")]
    NoStationFiles { folder: PathBuf, prefix: String },

    #[error("Failed to read station CSV '{path}'")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Missing required column '{column}' in '{path}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Row {row} of '{path}' has no station id")]
    NullStationId { path: PathBuf, row: usize },

    #[error("Row {row} of '{path}' has no timestamp")]
    NullTimestamp { path: PathBuf, row: usize },

    #[error("Failed to parse timestamp '{value}' in '{path}'")]
    TimestampParse { path: PathBuf, value: String },

    #[error("Failed processing DataFrame for '{path}'")]
    DataFrameProcessing {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to concatenate station tables")]
    Concat(#[source] PolarsError),

    #[error("Failed to create CSV export '{0}'")]
    ExportIo(PathBuf, #[source] std::io::Error),

    #[error("Failed to write CSV export '{0}'")]
    ExportPolars(PathBuf, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

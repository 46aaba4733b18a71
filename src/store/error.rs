use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to open database '{0}'")]
    Connect(PathBuf, #[source] sqlx::Error),

    #[error("Invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Table '{0}' does not exist")]
    MissingTable(String),

    #[error("Column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Cannot write an empty frame to table '{0}'")]
    EmptyFrame(String),

    #[error("Database operation failed on table '{table}'")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed converting rows of table '{table}' to a DataFrame")]
    Frame {
        table: String,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to parse timestamp '{value}' in table '{table}'")]
    TimestampParse { table: String, value: String },
}

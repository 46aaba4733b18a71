use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Column '{0}' not found in input table")]
    MissingColumn(String),

    #[error("Index column '{column}' must be a datetime, found {dtype}")]
    IndexNotTemporal { column: String, dtype: String },

    #[error("Join suffix for '{0}' must not be empty")]
    EmptySuffix(String),

    #[error("Date {0} days from the Unix epoch is out of range")]
    DateOutOfRange(i32),

    #[error("DataFrame operation failed: {0}")]
    DataFrame(#[from] PolarsError),
}

//! Conversions between polars frames and SQLite rows.

use crate::frame::{datetime_column, naive_datetimes, parse_timestamp, STORE_TIMESTAMP_FORMAT};
use crate::store::error::StoreError;
use polars::prelude::*;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// SQLite column type for a polars dtype. Timestamps are stored as text.
pub(crate) fn sql_type(dtype: &DataType) -> &'static str {
    if dtype.is_integer() || matches!(dtype, DataType::Boolean) {
        "INTEGER"
    } else if dtype.is_float() {
        "REAL"
    } else {
        "TEXT"
    }
}

/// Converts one column into bindable values.
pub(crate) fn column_values(column: &Column) -> PolarsResult<Vec<SqlValue>> {
    let dtype = column.dtype();
    if matches!(dtype, DataType::Datetime(_, _)) {
        return Ok(naive_datetimes(column)?
            .into_iter()
            .map(|v| match v {
                Some(dt) => SqlValue::Text(dt.format(STORE_TIMESTAMP_FORMAT).to_string()),
                None => SqlValue::Null,
            })
            .collect());
    }
    if dtype.is_integer() || matches!(dtype, DataType::Boolean) {
        let ints = column.cast(&DataType::Int64)?;
        return Ok(ints
            .i64()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, SqlValue::Integer))
            .collect());
    }
    if dtype.is_float() {
        let floats = column.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, SqlValue::Real))
            .collect());
    }
    let text = column.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string())))
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Real,
    Text,
}

/// Picks the widest storage class seen in a result column.
fn column_kind(rows: &[SqliteRow], index: usize) -> Result<ColumnKind, sqlx::Error> {
    let mut kind = None;
    for row in rows {
        let value = row.try_get_raw(index)?;
        if value.is_null() {
            continue;
        }
        let seen = match value.type_info().name() {
            "INTEGER" | "BOOLEAN" => ColumnKind::Integer,
            "REAL" | "NUMERIC" => ColumnKind::Real,
            _ => ColumnKind::Text,
        };
        kind = Some(match (kind, seen) {
            (None, seen) => seen,
            (Some(ColumnKind::Text), _) | (_, ColumnKind::Text) => ColumnKind::Text,
            (Some(ColumnKind::Real), _) | (_, ColumnKind::Real) => ColumnKind::Real,
            _ => ColumnKind::Integer,
        });
    }
    Ok(kind.unwrap_or(ColumnKind::Text))
}

/// Builds a frame from query rows. A text `index_column` is parsed into datetimes;
/// year-less values are anchored to `placeholder_year`.
pub(crate) fn rows_to_frame(
    rows: &[SqliteRow],
    table: &str,
    index_column: &str,
    placeholder_year: i32,
) -> Result<DataFrame, StoreError> {
    let Some(first) = rows.first() else {
        return Ok(DataFrame::empty());
    };
    let query_err = |source| StoreError::Query {
        table: table.to_string(),
        source,
    };

    let mut columns = Vec::with_capacity(first.columns().len());
    for (index, sql_column) in first.columns().iter().enumerate() {
        let name = sql_column.name();
        let column = match column_kind(rows, index).map_err(query_err)? {
            ColumnKind::Integer => {
                let values = rows
                    .iter()
                    .map(|row| row.try_get_unchecked::<Option<i64>, _>(index))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(query_err)?;
                Column::new(name.into(), values)
            }
            ColumnKind::Real => {
                let values = rows
                    .iter()
                    .map(|row| row.try_get_unchecked::<Option<f64>, _>(index))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(query_err)?;
                Column::new(name.into(), values)
            }
            ColumnKind::Text if name == index_column => {
                let mut stamps = Vec::with_capacity(rows.len());
                for row in rows {
                    let raw = row
                        .try_get_unchecked::<Option<String>, _>(index)
                        .map_err(query_err)?
                        .unwrap_or_default();
                    let parsed = parse_timestamp(&raw, placeholder_year).ok_or_else(|| {
                        StoreError::TimestampParse {
                            table: table.to_string(),
                            value: raw.clone(),
                        }
                    })?;
                    stamps.push(parsed);
                }
                datetime_column(name, stamps)
            }
            ColumnKind::Text => {
                let values = rows
                    .iter()
                    .map(|row| row.try_get_unchecked::<Option<String>, _>(index))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(query_err)?;
                Column::new(name.into(), values)
            }
        };
        columns.push(column);
    }

    DataFrame::new(columns).map_err(|source| StoreError::Frame {
        table: table.to_string(),
        source,
    })
}

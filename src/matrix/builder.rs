//! Reshaping station tables into hour × date matrices.

use crate::frame::INDEX_COLUMN;
use crate::matrix::error::MatrixError;
use crate::matrix::hour_date_matrix::{HourDateMatrix, HOURS};
use chrono::NaiveDate;
use log::info;
use polars::prelude::*;

const VALUE_COLUMN: &str = "__matrix_value";
const DAY_COLUMN: &str = "__matrix_day";
const HOUR_COLUMN: &str = "__matrix_hour";
/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Mean of `field` per hour and calendar date.
///
/// An empty table yields a 24×0 matrix. Hour/date combinations without a
/// finite value are zero.
pub fn normals_matrix(frame: &DataFrame, field: &str) -> Result<HourDateMatrix, MatrixError> {
    if frame.height() == 0 {
        return Ok(logged(HourDateMatrix::empty(), field));
    }
    check_columns(frame, field)?;
    let values = frame
        .clone()
        .lazy()
        .select([index_expr(), value_expr(field).alias(VALUE_COLUMN)]);
    Ok(logged(crosstab_mean(values)?, field))
}

/// Mean of `other[field] - base[field]` per hour and calendar date.
///
/// `base` is left-joined with `other` on the timestamp index; the joined column is
/// named `{field}{suffix}`, so `suffix` must not be empty. Rows of `base` without a
/// match in `other` give no value, so their cells stay zero.
///
/// ```
/// use chrono::{NaiveDate, NaiveDateTime};
/// use climate_normals::change_matrix;
/// use polars::prelude::*;
///
/// fn frame(value: f64) -> DataFrame {
///     let stamp: NaiveDateTime = NaiveDate::from_ymd_opt(1900, 1, 1)
///         .unwrap()
///         .and_hms_opt(0, 0, 0)
///         .unwrap();
///     let date = DatetimeChunked::from_naive_datetime(
///         "date".into(),
///         [stamp],
///         TimeUnit::Milliseconds,
///     );
///     DataFrame::new(vec![
///         date.into_series().into(),
///         Column::new("hly_temp_normal".into(), [value]),
///     ])
///     .unwrap()
/// }
///
/// let matrix = change_matrix(&frame(30.0), &frame(40.0), "hly_temp_normal", "_20").unwrap();
/// assert_eq!(matrix.shape(), (24, 1));
/// assert_eq!(matrix.get(0, 0), Some(10.0));
/// ```
pub fn change_matrix(
    base: &DataFrame,
    other: &DataFrame,
    field: &str,
    suffix: &str,
) -> Result<HourDateMatrix, MatrixError> {
    if suffix.is_empty() {
        return Err(MatrixError::EmptySuffix(field.to_string()));
    }
    let label = format!("{field}{suffix} - {field}");
    if base.height() == 0 {
        return Ok(logged(HourDateMatrix::empty(), &label));
    }
    check_columns(base, field)?;

    let joined_field = format!("{field}{suffix}");
    let left = base
        .clone()
        .lazy()
        .select([index_expr(), value_expr(field)]);
    let joined = if other.height() == 0 {
        left.with_column(
            lit(NULL)
                .cast(DataType::Float64)
                .alias(joined_field.as_str()),
        )
    } else {
        check_columns(other, field)?;
        let right = other
            .clone()
            .lazy()
            .select([index_expr(), value_expr(field).alias(joined_field.as_str())]);
        left.left_join(right, col(INDEX_COLUMN), col(INDEX_COLUMN))
    };
    let values = joined.select([
        col(INDEX_COLUMN),
        (col(joined_field.as_str()) - col(field)).alias(VALUE_COLUMN),
    ]);
    Ok(logged(crosstab_mean(values)?, &label))
}

fn check_columns(frame: &DataFrame, field: &str) -> Result<(), MatrixError> {
    let index = frame
        .column(INDEX_COLUMN)
        .map_err(|_| MatrixError::MissingColumn(INDEX_COLUMN.to_string()))?;
    if !matches!(index.dtype(), DataType::Datetime(_, _)) {
        return Err(MatrixError::IndexNotTemporal {
            column: INDEX_COLUMN.to_string(),
            dtype: index.dtype().to_string(),
        });
    }
    if frame.column(field).is_err() {
        return Err(MatrixError::MissingColumn(field.to_string()));
    }
    Ok(())
}

fn index_expr() -> Expr {
    col(INDEX_COLUMN).cast(DataType::Datetime(TimeUnit::Milliseconds, None))
}

fn value_expr(field: &str) -> Expr {
    col(field).cast(DataType::Float64)
}

/// Pivots `(date, value)` rows into hours × distinct dates, averaging duplicates.
fn crosstab_mean(values: LazyFrame) -> Result<HourDateMatrix, MatrixError> {
    let grouped = values
        .filter(col(INDEX_COLUMN).is_not_null())
        .select([
            col(INDEX_COLUMN)
                .dt()
                .date()
                .cast(DataType::Int32)
                .alias(DAY_COLUMN),
            col(INDEX_COLUMN)
                .dt()
                .hour()
                .cast(DataType::Int32)
                .alias(HOUR_COLUMN),
            col(VALUE_COLUMN).fill_nan(lit(NULL)),
        ])
        .group_by([col(DAY_COLUMN), col(HOUR_COLUMN)])
        .agg([col(VALUE_COLUMN).mean()])
        .sort([DAY_COLUMN, HOUR_COLUMN], SortMultipleOptions::default())
        .collect()?;

    let days = grouped.column(DAY_COLUMN)?.i32()?;
    let hours = grouped.column(HOUR_COLUMN)?.i32()?;
    let means = grouped.column(VALUE_COLUMN)?.f64()?;

    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut last_day = None;
    let mut cells: Vec<(usize, usize, f64)> = Vec::with_capacity(grouped.height());
    for ((day, hour), mean) in days.into_iter().zip(hours).zip(means) {
        let (Some(day), Some(hour)) = (day, hour) else {
            continue;
        };
        if last_day != Some(day) {
            dates.push(date_from_epoch_days(day)?);
            last_day = Some(day);
        }
        if let Some(mean) = mean.filter(|m| m.is_finite()) {
            cells.push((hour as usize, dates.len() - 1, mean));
        }
    }

    let width = dates.len();
    let mut dense = vec![0.0; HOURS * width];
    for (hour, column, mean) in cells {
        if hour < HOURS {
            dense[hour * width + column] = mean;
        }
    }
    Ok(HourDateMatrix::from_dense(dates, dense))
}

fn date_from_epoch_days(days: i32) -> Result<NaiveDate, MatrixError> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or(MatrixError::DateOutOfRange(days))
}

fn logged(matrix: HourDateMatrix, label: &str) -> HourDateMatrix {
    let (rows, columns) = matrix.shape();
    info!(
        "Matrix of {} is {}x{} (min {:?}, max {:?})",
        label,
        rows,
        columns,
        matrix.min(),
        matrix.max()
    );
    matrix
}

//! Shared column names and `DataFrame` helpers used by the collector, the store
//! and the matrix builder.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Name of the station identifier column in every normalized table.
pub const STATION_COLUMN: &str = "ghcn_id";
/// Name of the timestamp column; this is the row index of a station frame.
pub const INDEX_COLUMN: &str = "date";
/// The hourly normal temperature variable after column-name normalization.
pub const NORMAL_TEMP_COLUMN: &str = "hly_temp_normal";

/// Year given to `MM-DDTHH:MM:SS` timestamps unless configured otherwise. Not a leap year.
pub const DEFAULT_PLACEHOLDER_YEAR: i32 = 1900;

/// Text representation used when timestamps are written to the store.
pub(crate) const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FULL_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Lower-cases a raw CSV header and converts hyphens to underscores,
/// e.g. `HLY-TEMP-NORMAL` becomes `hly_temp_normal`.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

/// Parses a climate-normal timestamp.
///
/// Accepts full timestamps (`2020-01-01T00:00:00` or `2020-01-01 00:00:00`) and the
/// year-less NOAA normals form (`01-01T00:00:00`). The latter is anchored to
/// `placeholder_year`, which should be a non-leap year since normals skip Feb 29.
pub fn parse_timestamp(value: &str, placeholder_year: i32) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in FULL_TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    let anchored = format!("{placeholder_year:04}-{value}");
    NaiveDateTime::parse_from_str(&anchored, FULL_TIMESTAMP_FORMATS[0]).ok()
}

/// Builds a millisecond-precision datetime column.
pub(crate) fn datetime_column(name: &str, values: Vec<NaiveDateTime>) -> Column {
    DatetimeChunked::from_naive_datetime(name.into(), values, TimeUnit::Milliseconds)
        .into_series()
        .into()
}

/// Reads a datetime column back into chrono values, whatever its time unit.
pub(crate) fn naive_datetimes(column: &Column) -> PolarsResult<Vec<Option<NaiveDateTime>>> {
    let unit = match column.dtype() {
        DataType::Datetime(unit, _) => *unit,
        other => {
            return Err(PolarsError::SchemaMismatch(
                format!(
                    "expected a datetime column for '{}', found {}",
                    column.name(),
                    other
                )
                .into(),
            ))
        }
    };
    let ticks = column.cast(&DataType::Int64)?;
    Ok(ticks
        .i64()?
        .into_iter()
        .map(|tick| {
            tick.and_then(|t| match unit {
                TimeUnit::Milliseconds => DateTime::from_timestamp_millis(t),
                TimeUnit::Microseconds => DateTime::from_timestamp_micros(t),
                TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(t)),
            })
            .map(|dt| dt.naive_utc())
        })
        .collect())
}

/// Explicit display limits for logging frame previews.
///
/// Frames are never printed in full; callers pass one of these to decide how much
/// of a table ends up in a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub max_columns: usize,
    pub max_rows: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_columns: 10,
            max_rows: 5,
        }
    }
}

impl PreviewConfig {
    /// Returns the leading rows and columns of `frame` within these limits.
    pub fn preview(&self, frame: &DataFrame) -> DataFrame {
        let columns: Vec<Column> = frame
            .get_columns()
            .iter()
            .take(self.max_columns)
            .cloned()
            .collect();
        match DataFrame::new(columns) {
            Ok(narrow) => narrow.head(Some(self.max_rows)),
            Err(_) => DataFrame::empty(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn normalizes_noaa_headers() {
        assert_eq!(normalize_column_name("HLY-TEMP-NORMAL"), "hly_temp_normal");
        assert_eq!(
            normalize_column_name("HLY-TEMP-10PCTL_ATTRIBUTES"),
            "hly_temp_10pctl_attributes"
        );
    }

    #[test]
    fn parses_full_and_yearless_timestamps() {
        assert_eq!(
            parse_timestamp("2020-01-01T00:00:00", 1900),
            Some(at(2020, 1, 1, 0))
        );
        assert_eq!(
            parse_timestamp("2010-07-04 13:00:00", 1900),
            Some(at(2010, 7, 4, 13))
        );
        assert_eq!(
            parse_timestamp("12-31T23:00:00", 1900),
            Some(at(1900, 12, 31, 23))
        );
        assert_eq!(parse_timestamp("not a date", 1900), None);
        // Feb 29 only exists when the placeholder year is a leap year
        assert_eq!(parse_timestamp("02-29T00:00:00", 1900), None);
    }

    #[test]
    fn datetime_column_round_trips() -> PolarsResult<()> {
        let stamps = vec![at(2020, 3, 1, 5), at(2020, 3, 1, 6)];
        let column = datetime_column("date", stamps.clone());
        let back: Vec<NaiveDateTime> = naive_datetimes(&column)?.into_iter().flatten().collect();
        assert_eq!(back, stamps);
        Ok(())
    }

    #[test]
    fn naive_datetimes_rejects_non_temporal_columns() {
        let column = Column::new("date".into(), ["2020-01-01"]);
        assert!(naive_datetimes(&column).is_err());
    }

    #[test]
    fn preview_limits_rows_and_columns() {
        let frame = hourly_frame("USW00013874", at(2020, 1, 1, 0), &[1.0; 12]);
        let preview = PreviewConfig {
            max_columns: 2,
            max_rows: 3,
        }
        .preview(&frame);
        assert_eq!(preview.shape(), (3, 2));
    }
}

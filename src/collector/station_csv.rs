//! Reading and normalizing a single station's normals CSV.

use crate::collector::error::CollectError;
use crate::frame::{datetime_column, normalize_column_name, parse_timestamp, INDEX_COLUMN, STATION_COLUMN};
use chrono::{Datelike, Timelike};
use log::warn;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const RAW_STATION_COLUMN: &str = "STATION";
const RAW_DATE_COLUMN: &str = "DATE";
const RAW_NAME_COLUMN: &str = "NAME";

/// Calendar fields derived from the timestamp, placed right after it.
const DERIVED_COLUMNS: [&str; 3] = ["month", "day", "hour"];

/// One station file after normalization.
#[derive(Debug, Clone)]
pub struct StationCsv {
    pub path: PathBuf,
    /// Columns `ghcn_id, date, month, day, hour`, then the requested variables.
    pub frame: DataFrame,
    /// `(ghcn_id, NAME)` pairs when the file carries a `NAME` column.
    pub station_names: Vec<(String, String)>,
}

/// Reads `path` and normalizes it. Any problem with the file is an error.
pub fn read_station_csv(
    path: &Path,
    variables: &[String],
    placeholder_year: i32,
) -> Result<StationCsv, CollectError> {
    let csv_err = |source| CollectError::CsvRead {
        path: path.to_path_buf(),
        source,
    };
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(csv_err)?
        .finish()
        .map_err(csv_err)?;
    normalize_station_frame(raw, path, variables, placeholder_year)
}

pub(crate) fn normalize_station_frame(
    raw: DataFrame,
    path: &Path,
    variables: &[String],
    placeholder_year: i32,
) -> Result<StationCsv, CollectError> {
    let frame_err = |source| CollectError::DataFrameProcessing {
        path: path.to_path_buf(),
        source,
    };
    let present: HashSet<String> = raw
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let required = [RAW_STATION_COLUMN, RAW_DATE_COLUMN]
        .into_iter()
        .chain(variables.iter().map(String::as_str));
    for column in required {
        if !present.contains(column) {
            return Err(CollectError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let stations = text_values(&raw, RAW_STATION_COLUMN).map_err(frame_err)?;
    let mut station_ids = Vec::with_capacity(stations.len());
    for (row, station) in stations.into_iter().enumerate() {
        match station {
            Some(station) => station_ids.push(station),
            None => {
                return Err(CollectError::NullStationId {
                    path: path.to_path_buf(),
                    row,
                })
            }
        }
    }

    let dates = text_values(&raw, RAW_DATE_COLUMN).map_err(frame_err)?;
    let mut stamps = Vec::with_capacity(dates.len());
    for (row, date) in dates.into_iter().enumerate() {
        let Some(date) = date else {
            return Err(CollectError::NullTimestamp {
                path: path.to_path_buf(),
                row,
            });
        };
        let parsed = parse_timestamp(&date, placeholder_year).ok_or_else(|| {
            CollectError::TimestampParse {
                path: path.to_path_buf(),
                value: date.clone(),
            }
        })?;
        stamps.push(parsed);
    }

    let station_names = if present.contains(RAW_NAME_COLUMN) {
        let names = text_values(&raw, RAW_NAME_COLUMN).map_err(frame_err)?;
        first_name_per_station(&station_ids, names)
    } else {
        Vec::new()
    };

    let months: Vec<i32> = stamps.iter().map(|s| s.month() as i32).collect();
    let days: Vec<i32> = stamps.iter().map(|s| s.day() as i32).collect();
    let hours: Vec<i32> = stamps.iter().map(|s| s.hour() as i32).collect();
    let mut columns = vec![
        Column::new(STATION_COLUMN.into(), station_ids),
        datetime_column(INDEX_COLUMN, stamps),
        Column::new(DERIVED_COLUMNS[0].into(), months),
        Column::new(DERIVED_COLUMNS[1].into(), days),
        Column::new(DERIVED_COLUMNS[2].into(), hours),
    ];

    let mut taken: HashSet<String> = [STATION_COLUMN, INDEX_COLUMN]
        .into_iter()
        .chain(DERIVED_COLUMNS)
        .map(str::to_string)
        .collect();
    for variable in variables {
        let name = normalize_column_name(variable);
        if !taken.insert(name.clone()) {
            warn!(
                "Skipping variable '{}' in {}: column '{}' already present",
                variable,
                path.display(),
                name
            );
            continue;
        }
        let mut column = raw.column(variable).map_err(frame_err)?.clone();
        column.rename(name.into());
        columns.push(column);
    }

    let frame = DataFrame::new(columns).map_err(frame_err)?;
    Ok(StationCsv {
        path: path.to_path_buf(),
        frame,
        station_names,
    })
}

fn text_values(frame: &DataFrame, column: &str) -> PolarsResult<Vec<Option<String>>> {
    let text = frame.column(column)?.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn first_name_per_station(
    station_ids: &[String],
    names: Vec<Option<String>>,
) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    station_ids
        .iter()
        .zip(names)
        .filter_map(|(station, name)| {
            let name = name?.trim().to_string();
            (!name.is_empty() && seen.insert(station.clone())).then(|| (station.clone(), name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::naive_datetimes;
    use crate::frame::test_support::at;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn normalizes_noaa_normals_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let path = write_csv(
            tmp.path(),
            "USW00013874.csv",
            "STATION,NAME,DATE,HLY-TEMP-NORMAL,HLY-TEMP-NORMAL_ATTRIBUTES,HLY-TEMP-10PCTL\n\
             USW00013874,\"ATLANTA HARTSFIELD INTL AP, GA US\",01-01T00:00:00,44.9,S,35.1\n\
             USW00013874,\"ATLANTA HARTSFIELD INTL AP, GA US\",01-01T01:00:00,44.3,S,34.6\n",
        );

        let csv = read_station_csv(
            &path,
            &vars(&["HLY-TEMP-NORMAL", "HLY-TEMP-NORMAL_ATTRIBUTES"]),
            1900,
        )?;
        let names: Vec<String> = csv
            .frame
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "ghcn_id",
                "date",
                "month",
                "day",
                "hour",
                "hly_temp_normal",
                "hly_temp_normal_attributes"
            ]
        );
        let stamps = naive_datetimes(csv.frame.column("date")?)?;
        assert_eq!(stamps[1], Some(at(1900, 1, 1, 1)));
        assert_eq!(csv.frame.column("hour")?.i32()?.get(1), Some(1));
        assert_eq!(
            csv.station_names,
            vec![(
                "USW00013874".to_string(),
                "ATLANTA HARTSFIELD INTL AP, GA US".to_string()
            )]
        );
        Ok(())
    }

    #[test]
    fn missing_variable_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let path = write_csv(
            tmp.path(),
            "USW1.csv",
            "STATION,DATE,HLY-TEMP-NORMAL\nUSW1,2020-01-01T00:00:00,32\n",
        );
        let result = read_station_csv(&path, &vars(&["HLY-TEMP-90PCTL"]), 1900);
        match result {
            Err(CollectError::MissingColumn { column, .. }) => {
                assert_eq!(column, "HLY-TEMP-90PCTL")
            }
            other => panic!("expected a missing column error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn unparseable_timestamp_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let path = write_csv(
            tmp.path(),
            "USW1.csv",
            "STATION,DATE,HLY-TEMP-NORMAL\nUSW1,yesterday,32\n",
        );
        let result = read_station_csv(&path, &vars(&["HLY-TEMP-NORMAL"]), 1900);
        assert!(matches!(result, Err(CollectError::TimestampParse { .. })));
        Ok(())
    }

    #[test]
    fn duplicate_variables_are_kept_once() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let path = write_csv(
            tmp.path(),
            "USW1.csv",
            "STATION,DATE,HLY-TEMP-NORMAL\nUSW1,2020-01-01T00:00:00,32\n",
        );
        let csv = read_station_csv(
            &path,
            &vars(&["HLY-TEMP-NORMAL", "HLY-TEMP-NORMAL", "DATE"]),
            1900,
        )?;
        assert_eq!(csv.frame.width(), 6);
        assert!(csv.station_names.is_empty());
        Ok(())
    }
}

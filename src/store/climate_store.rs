//! SQLite-backed gateway for normals tables.
//!
//! Writes go through [`ClimateStore::save_frame`] and report failures as
//! [`StoreError`]s. Reads go through [`ClimateStore::read_station`] and never fail:
//! a broken or empty query becomes [`StationData::NoData`] with its reason.

use crate::config::StoreConfig;
use crate::frame::{INDEX_COLUMN, STATION_COLUMN};
use crate::store::error::StoreError;
use crate::store::frame_sql::{column_values, rows_to_frame, sql_type, SqlValue};
use crate::types::reference_year::ReferenceYear;
use crate::types::station_data::{NoDataReason, StationData};
use crate::types::write_mode::WriteMode;
use crate::utils::{ensure_dir_exists, is_valid_identifier, quote_identifier};
use log::{debug, error, info, warn};
use polars::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub struct ClimateStore {
    pool: SqlitePool,
    config: StoreConfig,
}

impl ClimateStore {
    /// Opens (creating if needed) the database for `config.schema` and makes sure the
    /// station lookup table exists.
    pub async fn open(config: StoreConfig) -> Result<Self, StoreError> {
        ensure_dir_exists(&config.data_dir)
            .await
            .map_err(|e| StoreError::DataDirCreation(config.data_dir.clone(), e))?;
        for identifier in [&config.source, &config.station_table] {
            check_identifier(identifier)?;
        }

        let path = config.database_path();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connect(path.clone(), e))?;
        info!("Opened climate store at {}", path.display());

        let store = Self { pool, config };
        store.ensure_station_table().await?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn year_table(&self, year: ReferenceYear) -> String {
        self.config.year_table(year)
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_station_table(&self) -> Result<(), StoreError> {
        let table = &self.config.station_table;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} TEXT PRIMARY KEY, name TEXT)",
            quote_identifier(table),
            STATION_COLUMN
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                table: table.clone(),
                source,
            })?;
        Ok(())
    }

    /// Writes every row of `frame` into `table`.
    ///
    /// [`WriteMode::Replace`] drops and recreates the table; [`WriteMode::Append`] creates
    /// it when absent and inserts otherwise. Either way the whole write is one
    /// transaction, so readers see the previous table or the new one, never a mix.
    /// Returns the number of rows written. Failures are logged before being returned.
    pub async fn save_frame(
        &self,
        frame: &DataFrame,
        table: &str,
        mode: WriteMode,
    ) -> Result<usize, StoreError> {
        let result = self.write_frame(frame, table, mode).await;
        match &result {
            Ok(rows) => info!("Wrote {} rows to {} ({})", rows, table, mode),
            Err(e) => error!("Failed to write {} rows to {} ({}): {}", frame.height(), table, mode, e),
        }
        result
    }

    async fn write_frame(
        &self,
        frame: &DataFrame,
        table: &str,
        mode: WriteMode,
    ) -> Result<usize, StoreError> {
        check_identifier(table)?;
        if frame.width() == 0 {
            return Err(StoreError::EmptyFrame(table.to_string()));
        }
        let query_err = |source| StoreError::Query {
            table: table.to_string(),
            source,
        };

        let mut definitions = Vec::with_capacity(frame.width());
        let mut names = Vec::with_capacity(frame.width());
        let mut values = Vec::with_capacity(frame.width());
        for column in frame.get_columns() {
            let name = column.name().as_str();
            check_identifier(name)?;
            definitions.push(format!("{} {}", quote_identifier(name), sql_type(column.dtype())));
            names.push(quote_identifier(name));
            values.push(column_values(column).map_err(|source| StoreError::Frame {
                table: table.to_string(),
                source,
            })?);
        }

        let quoted_table = quote_identifier(table);
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quoted_table,
            definitions.join(", ")
        );
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted_table,
            names.join(", "),
            vec!["?"; names.len()].join(", ")
        );

        let mut tx = self.pool.begin().await.map_err(query_err)?;
        if mode == WriteMode::Replace {
            sqlx::query(&format!("DROP TABLE IF EXISTS {quoted_table}"))
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }
        sqlx::query(&create)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        for row in 0..frame.height() {
            let mut query = sqlx::query(&insert);
            for column in &values {
                query = match &column[row] {
                    SqlValue::Null => query.bind(None::<String>),
                    SqlValue::Integer(v) => query.bind(*v),
                    SqlValue::Real(v) => query.bind(*v),
                    SqlValue::Text(v) => query.bind(v.as_str()),
                };
            }
            query.execute(&mut *tx).await.map_err(query_err)?;
        }
        tx.commit().await.map_err(query_err)?;
        Ok(frame.height())
    }

    /// Inserts or updates `(ghcn_id, name)` pairs in the station lookup table.
    pub async fn save_station_names(&self, names: &[(String, String)]) -> Result<usize, StoreError> {
        let table = &self.config.station_table;
        let query_err = |source| StoreError::Query {
            table: table.clone(),
            source,
        };
        let sql = format!(
            "INSERT INTO {} ({id}, name) VALUES (?, ?) \
             ON CONFLICT({id}) DO UPDATE SET name = excluded.name",
            quote_identifier(table),
            id = STATION_COLUMN
        );

        let mut tx = self.pool.begin().await.map_err(query_err)?;
        for (station, name) in names {
            sqlx::query(&sql)
                .bind(station.as_str())
                .bind(name.as_str())
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }
        tx.commit().await.map_err(query_err)?;
        debug!("Recorded {} station names in {}", names.len(), table);
        Ok(names.len())
    }

    /// Looks up a station's display name.
    pub async fn station_name(&self, station: &str) -> Result<Option<String>, StoreError> {
        let table = &self.config.station_table;
        let sql = format!(
            "SELECT name FROM {} WHERE {} = ?",
            quote_identifier(table),
            STATION_COLUMN
        );
        let name = sqlx::query_scalar::<_, Option<String>>(&sql)
            .bind(station)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                table: table.clone(),
                source,
            })?;
        Ok(name.flatten())
    }

    /// Lists the tables in the store's namespace.
    pub async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| StoreError::Query {
            table: "sqlite_master".to_string(),
            source,
        })
    }

    /// Column names of `table`, in declaration order.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                table: table.to_string(),
                source,
            })
    }

    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.table_names().await?.iter().any(|t| t == table))
    }

    /// Reads one station's rows from the table for `year`.
    ///
    /// `fields` restricts the selected columns (the `date` index is always included);
    /// `None` selects every column. The returned frame is sorted by `date`.
    pub async fn read_station(
        &self,
        station: &str,
        year: ReferenceYear,
        fields: Option<&[&str]>,
    ) -> StationData {
        let table = self.year_table(year);
        match self.query_station(station, &table, fields).await {
            Ok(frame) if frame.height() == 0 => {
                info!("No rows for station {} in {}", station, table);
                StationData::NoData {
                    reason: NoDataReason::NoRows,
                }
            }
            Ok(frame) => {
                let name = match self.station_name(station).await {
                    Ok(name) => name,
                    Err(e) => {
                        warn!("Could not resolve name for station {}: {}", station, e);
                        None
                    }
                };
                debug!(
                    "Read {} rows x {} columns for station {} from {}",
                    frame.height(),
                    frame.width(),
                    station,
                    table
                );
                StationData::Loaded { frame, name }
            }
            Err(e) => {
                warn!(
                    "Query for station {} in {} failed, returning no data: {}",
                    station, table, e
                );
                StationData::NoData {
                    reason: NoDataReason::QueryFailed(error_chain(&e)),
                }
            }
        }
    }

    async fn query_station(
        &self,
        station: &str,
        table: &str,
        fields: Option<&[&str]>,
    ) -> Result<DataFrame, StoreError> {
        if !self.table_exists(table).await? {
            return Err(StoreError::MissingTable(table.to_string()));
        }
        let selection = match fields {
            None => "*".to_string(),
            Some(fields) => {
                // SQLite reads an unknown double-quoted name as a string literal
                let columns = self.table_columns(table).await?;
                for field in fields.iter().copied().chain([INDEX_COLUMN]) {
                    check_identifier(field)?;
                    if !columns.iter().any(|c| c == field) {
                        return Err(StoreError::UnknownColumn {
                            table: table.to_string(),
                            column: field.to_string(),
                        });
                    }
                }
                let mut selected: Vec<String> = Vec::with_capacity(fields.len() + 1);
                if !fields.contains(&INDEX_COLUMN) {
                    selected.push(quote_identifier(INDEX_COLUMN));
                }
                for field in fields {
                    selected.push(quote_identifier(field));
                }
                selected.join(", ")
            }
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            selection,
            quote_identifier(table),
            STATION_COLUMN
        );

        let rows = sqlx::query(&sql)
            .bind(station)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                table: table.to_string(),
                source,
            })?;
        let frame = rows_to_frame(&rows, table, INDEX_COLUMN, self.config.placeholder_year)?;
        if frame.height() == 0 {
            return Ok(frame);
        }
        frame
            .lazy()
            .sort([INDEX_COLUMN], SortMultipleOptions::default())
            .collect()
            .map_err(|source| StoreError::Frame {
                table: table.to_string(),
                source,
            })
    }
}

fn check_identifier(name: &str) -> Result<(), StoreError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Flattens an error and its sources into one diagnostic line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{at, hourly_frame};
    use crate::frame::NORMAL_TEMP_COLUMN;
    use crate::types::station_data::UNKNOWN_STATION_NAME;
    use tempfile::TempDir;

    async fn test_store() -> Result<(TempDir, ClimateStore), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let store = ClimateStore::open(StoreConfig::in_dir(tmp.path())).await?;
        Ok((tmp, store))
    }

    #[tokio::test]
    async fn open_creates_station_table() -> Result<(), Box<dyn std::error::Error>> {
        let (tmp, store) = test_store().await?;
        assert!(tmp.path().join("climate.sqlite").exists());
        assert_eq!(store.table_names().await?, vec!["ghcn_stations"]);
        Ok(())
    }

    #[tokio::test]
    async fn replace_then_query_round_trips() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let values = [30.5, 30.1, 29.8, 29.6];
        let frame = hourly_frame("USW00013874", at(2020, 1, 1, 0), &values);
        let table = store.year_table(ReferenceYear::Y2020);

        let written = store.save_frame(&frame, &table, WriteMode::Replace).await?;
        assert_eq!(written, 4);

        let data = store
            .read_station("USW00013874", ReferenceYear::Y2020, None)
            .await;
        assert!(data.is_loaded());
        let read = data.frame();
        assert_eq!(read.height(), values.len());
        assert!(matches!(
            read.column(INDEX_COLUMN)?.dtype(),
            DataType::Datetime(_, _)
        ));
        let temps: Vec<f64> = read
            .column(NORMAL_TEMP_COLUMN)?
            .f64()?
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(temps, values);
        Ok(())
    }

    #[tokio::test]
    async fn replace_drops_previous_rows_and_append_adds() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2010);
        let first = hourly_frame("USW00094728", at(2010, 1, 1, 0), &[1.0, 2.0, 3.0]);
        let second = hourly_frame("USW00094728", at(2010, 1, 2, 0), &[4.0, 5.0]);

        store.save_frame(&first, &table, WriteMode::Replace).await?;
        store.save_frame(&second, &table, WriteMode::Append).await?;
        let data = store
            .read_station("USW00094728", ReferenceYear::Y2010, None)
            .await;
        assert_eq!(data.height(), 5);

        store.save_frame(&second, &table, WriteMode::Replace).await?;
        let data = store
            .read_station("USW00094728", ReferenceYear::Y2010, None)
            .await;
        assert_eq!(data.height(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn append_with_mismatched_schema_fails() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2020);
        let frame = hourly_frame("USW00013874", at(2020, 1, 1, 0), &[1.0]);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;

        let extra = frame
            .clone()
            .lazy()
            .with_column(lit(1i64).alias("extra_column"))
            .collect()?;
        let result = store.save_frame(&extra, &table, WriteMode::Append).await;
        assert!(matches!(result, Err(StoreError::Query { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn rejects_unsafe_table_names() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let frame = hourly_frame("X", at(2020, 1, 1, 0), &[1.0]);
        let result = store
            .save_frame(&frame, "t; DROP TABLE ghcn_stations", WriteMode::Replace)
            .await;
        assert!(matches!(result, Err(StoreError::InvalidIdentifier(_))));
        Ok(())
    }

    #[tokio::test]
    async fn rows_come_back_sorted_by_date() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2020);
        let late = hourly_frame("S1", at(2020, 6, 1, 0), &[2.0, 2.0]);
        let early = hourly_frame("S1", at(2020, 1, 1, 0), &[1.0, 1.0]);
        store.save_frame(&late, &table, WriteMode::Replace).await?;
        store.save_frame(&early, &table, WriteMode::Append).await?;

        let frame = store
            .read_station("S1", ReferenceYear::Y2020, None)
            .await
            .into_frame();
        let stamps = crate::frame::naive_datetimes(frame.column(INDEX_COLUMN)?)?;
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(stamps[0], Some(at(2020, 1, 1, 0)));
        Ok(())
    }

    #[tokio::test]
    async fn explicit_fields_always_include_index() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2020);
        let frame = hourly_frame("S1", at(2020, 1, 1, 0), &[1.0, 2.0]);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;

        let data = store
            .read_station("S1", ReferenceYear::Y2020, Some(&[NORMAL_TEMP_COLUMN][..]))
            .await;
        let names: Vec<String> = data
            .frame()
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec![INDEX_COLUMN, NORMAL_TEMP_COLUMN]);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_station_yields_no_rows() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2020);
        let frame = hourly_frame("S1", at(2020, 1, 1, 0), &[1.0]);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;

        let data = store
            .read_station("NOPE", ReferenceYear::Y2020, None)
            .await;
        assert_eq!(data.no_data_reason(), Some(&NoDataReason::NoRows));
        assert_eq!(data.frame().height(), 0);
        assert_eq!(data.name(), UNKNOWN_STATION_NAME);
        Ok(())
    }

    #[tokio::test]
    async fn missing_table_yields_query_failure() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let data = store
            .read_station("S1", ReferenceYear::Y2010, None)
            .await;
        match data.no_data_reason() {
            Some(NoDataReason::QueryFailed(message)) => {
                assert!(message.contains("noaa_hlytemp_2010"))
            }
            other => panic!("expected a query failure, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn bad_field_name_yields_query_failure() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2020);
        let frame = hourly_frame("S1", at(2020, 1, 1, 0), &[1.0]);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;

        let data = store
            .read_station("S1", ReferenceYear::Y2020, Some(&["no_such_column"][..]))
            .await;
        assert!(matches!(
            data.no_data_reason(),
            Some(NoDataReason::QueryFailed(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn misspelled_field_is_not_read_as_text() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2020);
        let frame = hourly_frame("S1", at(2020, 1, 1, 0), &[31.0, 30.5]);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;

        let data = store
            .read_station("S1", ReferenceYear::Y2020, Some(&["hly_temp_normals"][..]))
            .await;
        assert!(!data.is_loaded());
        assert_eq!(data.height(), 0);
        assert_eq!(data.name(), UNKNOWN_STATION_NAME);
        match data.no_data_reason() {
            Some(NoDataReason::QueryFailed(message)) => {
                assert!(message.contains("hly_temp_normals"))
            }
            other => panic!("expected a query failure, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn lists_table_columns() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        let table = store.year_table(ReferenceYear::Y2020);
        let frame = hourly_frame("S1", at(2020, 1, 1, 0), &[1.0]);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;
        assert_eq!(
            store.table_columns(&table).await?,
            vec!["ghcn_id", "date", "hour", "hly_temp_normal"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn yearless_dates_use_configured_placeholder() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let config = StoreConfig {
            placeholder_year: 2001,
            ..StoreConfig::in_dir(tmp.path())
        };
        let store = ClimateStore::open(config).await?;
        let frame = DataFrame::new(vec![
            Column::new(STATION_COLUMN.into(), ["S1", "S1"]),
            Column::new(INDEX_COLUMN.into(), ["01-01T01:00:00", "01-01T00:00:00"]),
            Column::new(NORMAL_TEMP_COLUMN.into(), [44.3, 44.9]),
        ])?;
        let table = store.year_table(ReferenceYear::Y2010);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;

        let read = store
            .read_station("S1", ReferenceYear::Y2010, None)
            .await
            .into_frame();
        assert_eq!(
            crate::frame::naive_datetimes(read.column(INDEX_COLUMN)?)?,
            vec![Some(at(2001, 1, 1, 0)), Some(at(2001, 1, 1, 1))]
        );
        Ok(())
    }

    #[tokio::test]
    async fn station_names_are_upserted() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = test_store().await?;
        store
            .save_station_names(&[("S1".into(), "OLD NAME".into())])
            .await?;
        store
            .save_station_names(&[("S1".into(), "ATLANTA HARTSFIELD INTL AP, GA US".into())])
            .await?;
        assert_eq!(
            store.station_name("S1").await?.as_deref(),
            Some("ATLANTA HARTSFIELD INTL AP, GA US")
        );
        assert_eq!(store.station_name("S2").await?, None);

        let table = store.year_table(ReferenceYear::Y2020);
        let frame = hourly_frame("S1", at(2020, 1, 1, 0), &[1.0]);
        store.save_frame(&frame, &table, WriteMode::Replace).await?;
        let data = store
            .read_station("S1", ReferenceYear::Y2020, None)
            .await;
        assert_eq!(data.name(), "ATLANTA HARTSFIELD INTL AP, GA US");
        Ok(())
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = StoreError::DataDirCreation(
            "/x".into(),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            error_chain(&err),
            "Failed to create data directory '/x': denied"
        );
    }
}

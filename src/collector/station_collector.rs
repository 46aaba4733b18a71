//! Batch collection of every station file in a folder into one normalized table.

use crate::collector::error::CollectError;
use crate::collector::station_csv::{read_station_csv, StationCsv};
use crate::config::CollectOptions;
use crate::frame::PreviewConfig;
use crate::store::climate_store::ClimateStore;
use crate::types::write_mode::WriteMode;
use futures_util::stream::{self, StreamExt};
use log::{debug, info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;

/// The concatenated result of a collection run.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Every row of every station file, in file order.
    pub frame: DataFrame,
    pub files: Vec<PathBuf>,
    /// Rows appended to the store's target table.
    pub rows_written: usize,
    /// Files whose append to the store failed. Their rows are still in `frame`.
    pub failed_writes: Vec<PathBuf>,
}

impl Collection {
    /// Writes the concatenated table to a CSV file with a header row.
    pub fn write_csv(&mut self, path: &Path) -> Result<(), CollectError> {
        let file = std::fs::File::create(path)
            .map_err(|e| CollectError::ExportIo(path.to_path_buf(), e))?;
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut self.frame)
            .map_err(|e| CollectError::ExportPolars(path.to_path_buf(), e))?;
        info!("Exported {} rows to {}", self.frame.height(), path.display());
        Ok(())
    }
}

/// Reads station CSVs from a folder, appends each to the store, and concatenates them.
///
/// File problems abort the run. Store write failures are logged and collected in
/// [`Collection::failed_writes`]; the run continues.
pub struct StationCsvCollector<'a> {
    store: &'a ClimateStore,
    options: CollectOptions,
    preview: PreviewConfig,
}

impl<'a> StationCsvCollector<'a> {
    pub fn new(store: &'a ClimateStore, options: CollectOptions) -> Self {
        Self {
            store,
            options,
            preview: PreviewConfig::default(),
        }
    }

    pub fn with_preview(mut self, preview: PreviewConfig) -> Self {
        self.preview = preview;
        self
    }

    /// Files in `folder` named `<file_prefix>*.csv`, sorted by path.
    pub async fn station_files(&self, folder: &Path) -> Result<Vec<PathBuf>, CollectError> {
        let read_err = |e| CollectError::FolderRead(folder.to_path_buf(), e);
        let mut entries = tokio::fs::read_dir(folder).await.map_err(read_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv && name.starts_with(&self.options.file_prefix) && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Collects `variables` (raw CSV header names) from every station file in `folder`.
    pub async fn collect(
        &self,
        folder: &Path,
        variables: &[&str],
    ) -> Result<Collection, CollectError> {
        let files = self.station_files(folder).await?;
        if files.is_empty() {
            return Err(CollectError::NoStationFiles {
                folder: folder.to_path_buf(),
                prefix: self.options.file_prefix.clone(),
            });
        }
        let total = files.len();
        let table = self.store.year_table(self.options.target_year);
        info!(
            "Collecting {} variables from {} station files in {} into {}",
            variables.len(),
            total,
            folder.display(),
            table
        );

        let variables: Arc<Vec<String>> =
            Arc::new(variables.iter().map(|v| v.to_string()).collect());
        let placeholder_year = self.options.placeholder_year;
        let mut parsed = stream::iter(files.clone())
            .map(|path| {
                let variables = Arc::clone(&variables);
                async move {
                    task::spawn_blocking(move || {
                        read_station_csv(&path, &variables, placeholder_year)
                    })
                    .await
                    .unwrap_or_else(|e| Err(CollectError::TaskJoin(e)))
                }
            })
            .buffered(self.options.concurrency.max(1));

        let mut frames = Vec::with_capacity(total);
        let mut rows_written = 0;
        let mut failed_writes = Vec::new();
        let mut index = 0;
        while let Some(result) = parsed.next().await {
            index += 1;
            let station_csv = result?;
            info!(
                "[{}/{}] Collected {} rows from {}",
                index,
                total,
                station_csv.frame.height(),
                station_csv.path.display()
            );
            debug!("{}", self.preview.preview(&station_csv.frame));

            match self
                .store
                .save_frame(&station_csv.frame, &table, WriteMode::Append)
                .await
            {
                Ok(rows) => rows_written += rows,
                Err(_) => failed_writes.push(station_csv.path.clone()),
            }
            self.record_station_names(&station_csv).await;
            frames.push(station_csv.frame.lazy());
        }

        let args = UnionArgs {
            to_supertypes: true,
            ..Default::default()
        };
        let frame = concat(frames, args)
            .and_then(|combined| combined.collect())
            .map_err(CollectError::Concat)?;
        info!(
            "Collected {} rows from {} files ({} rows written, {} failed writes)",
            frame.height(),
            total,
            rows_written,
            failed_writes.len()
        );

        Ok(Collection {
            frame,
            files,
            rows_written,
            failed_writes,
        })
    }

    async fn record_station_names(&self, station_csv: &StationCsv) {
        if !self.options.record_station_names || station_csv.station_names.is_empty() {
            return;
        }
        if let Err(e) = self
            .store
            .save_station_names(&station_csv.station_names)
            .await
        {
            warn!(
                "Failed to record station names from {}: {}",
                station_csv.path.display(),
                e
            );
        }
    }
}

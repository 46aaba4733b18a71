//! The main entry point: collect station CSVs into the store, read them back per
//! station and decade, and render hour × date heatmaps of normals and their changes.

use crate::city_loader::CityDataLoader;
use crate::collector::station_collector::{Collection, StationCsvCollector};
use crate::config::{CollectOptions, RenderConfig, StoreConfig};
use crate::error::ClimateError;
use crate::frame::{PreviewConfig, NORMAL_TEMP_COLUMN};
use crate::heatmap::color_scale::{ColorScale, ScaleMode};
use crate::heatmap::renderer::{render_heatmap, RenderTarget};
use crate::matrix::builder::{change_matrix, normals_matrix};
use crate::matrix::hour_date_matrix::HourDateMatrix;
use crate::store::climate_store::ClimateStore;
use crate::types::city_dataset::CityDataset;
use crate::types::reference_year::ReferenceYear;
use crate::types::station_data::StationData;
use crate::types::write_mode::WriteMode;
use bon::bon;
use log::info;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tokio::task;

/// Value axis label for temperature deltas; NOAA normals are in °F.
const CHANGE_LABEL: &str = "Change (°F)";
const NORMALS_LABEL: &str = "Temperature (°F)";

/// Client for a climate-normals store.
///
/// Create one with [`ClimateNormals::new()`] to use the default data directory, or
/// [`ClimateNormals::with_config()`] to choose where the SQLite database lives.
///
/// # Examples
///
/// ```rust
/// # use climate_normals::{ClimateNormals, ClimateError, StoreConfig};
/// # async fn run() -> Result<(), ClimateError> {
/// let client = ClimateNormals::with_config(StoreConfig::in_dir("/tmp/normals")).await?;
/// let data = client
///     .station_data()
///     .station("USW00013874")
///     .year(climate_normals::ReferenceYear::Y2020)
///     .call()
///     .await;
/// println!("{} rows for {}", data.height(), data.name());
/// # Ok(())
/// # }
/// ```
pub struct ClimateNormals {
    store: ClimateStore,
    render: RenderConfig,
    preview: PreviewConfig,
}

#[bon]
impl ClimateNormals {
    /// Opens the store described by `config`, creating its directory and database file
    /// when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::Store`] when the data directory cannot be created, the
    /// configured table names are not plain identifiers, or the database cannot be opened.
    pub async fn with_config(config: StoreConfig) -> Result<Self, ClimateError> {
        Ok(Self {
            store: ClimateStore::open(config).await?,
            render: RenderConfig::default(),
            preview: PreviewConfig::default(),
        })
    }

    /// Opens the store in the default data directory
    /// (e.g. `~/.local/share/climate_normals` on Linux).
    pub async fn new() -> Result<Self, ClimateError> {
        Self::with_config(StoreConfig::default()).await
    }

    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn with_preview(mut self, preview: PreviewConfig) -> Self {
        self.preview = preview;
        self
    }

    pub fn store(&self) -> &ClimateStore {
        &self.store
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    /// Collects `variables` from every station CSV in `folder`.
    ///
    /// Each file is appended to the target-year table as it is read. With `export_csv`
    /// set, the concatenated table is also written there.
    ///
    /// # Arguments
    ///
    /// * `.folder(&Path)`: **Required.** Folder holding `USW*.csv` station files.
    /// * `.variables(&[&str])`: **Required.** Raw CSV headers, e.g. `HLY-TEMP-NORMAL`.
    /// * `.options(CollectOptions)`: Optional. Defaults to [`CollectOptions::default()`].
    /// * `.export_csv(&Path)`: Optional. Where to write the concatenated table.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::Collect`] when the folder cannot be read, holds no station
    /// files, or any file is malformed. Store write failures do not abort the run; they
    /// are listed in [`Collection::failed_writes`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use climate_normals::{ClimateNormals, ClimateError};
    /// # use std::path::Path;
    /// # async fn run(client: ClimateNormals) -> Result<(), ClimateError> {
    /// let collection = client
    ///     .collect_station_csvs()
    ///     .folder(Path::new("us-climate-normals_1991-2020"))
    ///     .variables(&["HLY-TEMP-NORMAL", "HLY-TEMP-10PCTL", "HLY-TEMP-90PCTL"])
    ///     .export_csv(Path::new("data_for_store.csv"))
    ///     .call()
    ///     .await?;
    /// println!("{} rows from {} files", collection.frame.height(), collection.files.len());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn collect_station_csvs(
        &self,
        folder: &Path,
        variables: &[&str],
        options: Option<CollectOptions>,
        export_csv: Option<&Path>,
    ) -> Result<Collection, ClimateError> {
        let collector = StationCsvCollector::new(&self.store, options.unwrap_or_default())
            .with_preview(self.preview);
        let mut collection = collector.collect(folder, variables).await?;
        if let Some(path) = export_csv {
            collection.write_csv(path)?;
        }
        Ok(collection)
    }

    /// Writes `frame` to `table`, replacing or appending. Returns the rows written.
    pub async fn save_frame(
        &self,
        frame: &DataFrame,
        table: &str,
        mode: WriteMode,
    ) -> Result<usize, ClimateError> {
        Ok(self.store.save_frame(frame, table, mode).await?)
    }

    /// Reads one station's normals for `year`. Never fails; see [`StationData`].
    ///
    /// # Arguments
    ///
    /// * `.station(&str)`: **Required.** GHCN id, e.g. `USW00013874`.
    /// * `.year(ReferenceYear)`: **Required.** Which decade's table to read.
    /// * `.fields(&[&str])`: Optional. Columns to select; the `date` index is always
    ///   included. Defaults to every column.
    #[builder]
    pub async fn station_data(
        &self,
        station: &str,
        year: ReferenceYear,
        fields: Option<&[&str]>,
    ) -> StationData {
        self.store.read_station(station, year, fields).await
    }

    /// Reads every station in `stations` for each year (default: 2010 and 2020).
    ///
    /// Stations keep their requested order and are not deduplicated. `concurrency`
    /// bounds how many stations are read at once (default 1).
    #[builder]
    pub async fn city_data(
        &self,
        stations: &[&str],
        years: Option<&[ReferenceYear]>,
        concurrency: Option<usize>,
    ) -> CityDataset {
        CityDataLoader::new(&self.store)
            .with_years(years.unwrap_or(&ReferenceYear::DECADE_PAIR))
            .with_concurrency(concurrency.unwrap_or(1))
            .load(stations)
            .await
    }

    /// Renders `matrix` on a blocking thread and returns the PNG path.
    pub async fn render_heatmap(
        &self,
        matrix: HourDateMatrix,
        mode: ScaleMode,
        title: &str,
        value_label: &str,
        target: RenderTarget,
    ) -> Result<PathBuf, ClimateError> {
        let scale = ColorScale::for_matrix(mode, &matrix);
        let title = title.to_string();
        let value_label = value_label.to_string();
        let config = self.render.clone();
        let path = task::spawn_blocking(move || {
            render_heatmap(&matrix, &scale, &title, &value_label, &target, &config)
        })
        .await??;
        Ok(path)
    }

    /// Renders the 2020 − 2010 change of each station to `<out_dir>/<station>_change.png`.
    ///
    /// Without `out_dir` each heatmap goes to a temporary PNG for viewing. Returns the
    /// written paths in station order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use climate_normals::{ClimateNormals, ClimateError};
    /// # use std::path::Path;
    /// # async fn run(client: ClimateNormals) -> Result<(), ClimateError> {
    /// let images = client
    ///     .render_city_change()
    ///     .stations(&["USW00013874", "USW00094728"])
    ///     .out_dir(Path::new("graphs"))
    ///     .call()
    ///     .await?;
    /// assert_eq!(images.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn render_city_change(
        &self,
        stations: &[&str],
        out_dir: Option<&Path>,
        field: Option<&str>,
    ) -> Result<Vec<PathBuf>, ClimateError> {
        let field = field.unwrap_or(NORMAL_TEMP_COLUMN);
        let dataset = self
            .city_data()
            .stations(stations)
            .years(&ReferenceYear::DECADE_PAIR)
            .call()
            .await;

        let mut written = Vec::with_capacity(dataset.len());
        for station in dataset.iter() {
            let matrix = change_matrix(
                &station.frame(ReferenceYear::Y2010),
                &station.frame(ReferenceYear::Y2020),
                field,
                "_20",
            )?;
            let title = format!(
                "{} ({}): change in hourly normals, {} vs {}",
                station.name(),
                station.station,
                ReferenceYear::Y2020,
                ReferenceYear::Y2010
            );
            let target = image_target(out_dir, &format!("{}_change.png", station.station));
            written.push(
                self.render_heatmap(matrix, ScaleMode::Change, &title, CHANGE_LABEL, target)
                    .await?,
            );
        }
        info!("Rendered {} city change heatmaps", written.len());
        Ok(written)
    }

    /// Renders station B minus station A for each year (default: 2010 and 2020) to
    /// `<out_dir>/city_comparison_<b>_minus_<a>_<year>.png`.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::ComparisonNeedsTwoStations`] unless exactly two stations
    /// are given.
    #[builder]
    pub async fn render_city_comparison(
        &self,
        stations: &[&str],
        years: Option<&[ReferenceYear]>,
        out_dir: Option<&Path>,
        field: Option<&str>,
    ) -> Result<Vec<PathBuf>, ClimateError> {
        let &[first, second] = stations else {
            return Err(ClimateError::ComparisonNeedsTwoStations(stations.len()));
        };
        let years = years.unwrap_or(&ReferenceYear::DECADE_PAIR);
        let field = field.unwrap_or(NORMAL_TEMP_COLUMN);
        let dataset = self
            .city_data()
            .stations(stations)
            .years(years)
            .call()
            .await;
        let (Some(a), Some(b)) = (dataset.get(first), dataset.get(second)) else {
            return Err(ClimateError::ComparisonNeedsTwoStations(dataset.len()));
        };

        let mut written = Vec::with_capacity(years.len());
        for &year in years {
            let matrix = change_matrix(&a.frame(year), &b.frame(year), field, &format!("_{second}"))?;
            let title = format!("{} minus {}: hourly normals, {}", b.name(), a.name(), year);
            let target = image_target(
                out_dir,
                &format!("city_comparison_{second}_minus_{first}_{year}.png"),
            );
            written.push(
                self.render_heatmap(matrix, ScaleMode::Change, &title, CHANGE_LABEL, target)
                    .await?,
            );
        }
        Ok(written)
    }

    /// Renders one station's normals for `year` on the absolute temperature scale.
    ///
    /// Defaults to a temporary PNG when no `target` is given.
    #[builder]
    pub async fn render_normals(
        &self,
        station: &str,
        year: ReferenceYear,
        target: Option<RenderTarget>,
        field: Option<&str>,
    ) -> Result<PathBuf, ClimateError> {
        let field = field.unwrap_or(NORMAL_TEMP_COLUMN);
        let data = self.store.read_station(station, year, Some(&[field][..])).await;
        let matrix = normals_matrix(&data.frame(), field)?;
        let title = format!("{} ({}): hourly normals, {}", data.name(), station, year);
        self.render_heatmap(
            matrix,
            ScaleMode::Absolute,
            &title,
            NORMALS_LABEL,
            target.unwrap_or(RenderTarget::Display),
        )
        .await
    }
}

fn image_target(out_dir: Option<&Path>, file_name: &str) -> RenderTarget {
    match out_dir {
        Some(dir) => RenderTarget::File(dir.join(file_name)),
        None => RenderTarget::Display,
    }
}

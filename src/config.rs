//! Configuration for the store, the CSV collector and the heatmap renderer.
//!
//! Every struct has a `Default` matching the NOAA hourly normals layout and can be
//! loaded from JSON; missing fields fall back to their defaults.

use crate::error::ClimateError;
use crate::frame::DEFAULT_PLACEHOLDER_YEAR;
use crate::types::reference_year::ReferenceYear;
use crate::utils::default_data_dir;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where and how normals tables are stored.
///
/// The store is one SQLite file per schema namespace, `<data_dir>/<schema>.sqlite`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    /// Schema namespace holding the year tables and the station lookup table.
    pub schema: String,
    /// Prefix of the year tables, `<source>_hlytemp_<year>`.
    pub source: String,
    /// Lookup table mapping `ghcn_id` to a display `name`.
    pub station_table: String,
    pub max_connections: u32,
    /// Year used when a stored timestamp carries only month, day and time.
    pub placeholder_year: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            schema: "climate".to_string(),
            source: "noaa".to_string(),
            station_table: "ghcn_stations".to_string(),
            max_connections: 4,
            placeholder_year: DEFAULT_PLACEHOLDER_YEAR,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite", self.schema))
    }

    pub fn year_table(&self, year: ReferenceYear) -> String {
        year.table_name(&self.source)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ClimateError> {
        read_json(path)
    }
}

/// Options for [`crate::StationCsvCollector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectOptions {
    /// Station files are `<file_prefix>*.csv`; NOAA first-order stations start with `USW`.
    pub file_prefix: String,
    /// Year used for timestamps that carry only month, day and time.
    pub placeholder_year: i32,
    /// Each per-file table is appended to this year's table as it is collected.
    pub target_year: ReferenceYear,
    /// Record `NAME` values into the station lookup table when the CSV has them.
    pub record_station_names: bool,
    /// Number of files parsed at once. Output order never depends on this.
    pub concurrency: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            file_prefix: "USW".to_string(),
            placeholder_year: DEFAULT_PLACEHOLDER_YEAR,
            target_year: ReferenceYear::Y2020,
            record_station_names: true,
            concurrency: 1,
        }
    }
}

/// Fixed rendering constants for heatmaps, passed explicitly to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub title_font_size: u32,
    pub label_font_size: u32,
    pub tick_font_size: u32,
    pub font_family: String,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 3600,
            height: 900,
            title_font_size: 48,
            label_font_size: 30,
            tick_font_size: 24,
            font_family: "sans-serif".to_string(),
            margin_left: 120,
            margin_right: 280,
            margin_top: 100,
            margin_bottom: 80,
        }
    }
}

impl RenderConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ClimateError> {
        read_json(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ClimateError> {
    let bytes =
        std::fs::read(path).map_err(|e| ClimateError::ConfigRead(path.to_path_buf(), e))?;
    serde_json::from_slice(&bytes).map_err(|e| ClimateError::ConfigParse(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_layout() {
        let config = StoreConfig::in_dir("/tmp/normals");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/normals/climate.sqlite")
        );
        assert_eq!(config.year_table(ReferenceYear::Y2010), "noaa_hlytemp_2010");
        assert_eq!(config.station_table, "ghcn_stations");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("store.json");
        std::fs::write(&path, r#"{ "schema": "normals", "max_connections": 1 }"#)?;

        let config = StoreConfig::from_json_file(&path)?;
        assert_eq!(config.schema, "normals");
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.source, "noaa");

        let options: CollectOptions = serde_json::from_str(r#"{ "target_year": 2010 }"#)?;
        assert_eq!(options.target_year, ReferenceYear::Y2010);
        assert_eq!(options.file_prefix, "USW");
        Ok(())
    }

    #[test]
    fn unreadable_config_is_reported() {
        let err = RenderConfig::from_json_file(Path::new("/definitely/not/here.json"));
        assert!(matches!(err, Err(ClimateError::ConfigRead(_, _))));
    }
}

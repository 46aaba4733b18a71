mod city_loader;
mod climate_normals;
mod collector;
mod config;
mod error;
mod frame;
mod heatmap;
mod matrix;
mod store;
mod types;
mod utils;

pub use city_loader::CityDataLoader;
pub use climate_normals::ClimateNormals;
pub use config::{CollectOptions, RenderConfig, StoreConfig};
pub use error::ClimateError;
pub use frame::{
    normalize_column_name, parse_timestamp, PreviewConfig, DEFAULT_PLACEHOLDER_YEAR, INDEX_COLUMN,
    NORMAL_TEMP_COLUMN, STATION_COLUMN,
};
pub use utils::default_data_dir;

pub use collector::error::CollectError;
pub use collector::station_collector::{Collection, StationCsvCollector};
pub use collector::station_csv::{read_station_csv, StationCsv};

pub use store::climate_store::ClimateStore;
pub use store::error::StoreError;

pub use matrix::builder::{change_matrix, normals_matrix};
pub use matrix::error::MatrixError;
pub use matrix::hour_date_matrix::{HourDateMatrix, HOURS};

pub use heatmap::axis::{hour_ticks, month_ticks};
pub use heatmap::color_scale::{ColorScale, ScaleMode};
pub use heatmap::error::HeatmapError;
pub use heatmap::renderer::{render_heatmap, RenderTarget};

pub use types::city_dataset::{CityDataset, StationDataset};
pub use types::reference_year::ReferenceYear;
pub use types::station_data::{NoDataReason, StationData, UNKNOWN_STATION_NAME};
pub use types::write_mode::WriteMode;

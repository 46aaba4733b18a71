pub mod error;
pub mod station_collector;
pub mod station_csv;

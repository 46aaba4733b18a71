pub mod climate_store;
pub mod error;
mod frame_sql;

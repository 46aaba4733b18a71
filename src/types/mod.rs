pub mod city_dataset;
pub mod reference_year;
pub mod station_data;
pub mod write_mode;

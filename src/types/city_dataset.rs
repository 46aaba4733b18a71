//! In-memory normals for a list of stations across the decade pair.

use crate::types::reference_year::ReferenceYear;
use crate::types::station_data::{StationData, UNKNOWN_STATION_NAME};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

/// Both decades of normals for one station.
#[derive(Debug, Clone)]
pub struct StationDataset {
    pub station: String,
    pub years: BTreeMap<ReferenceYear, StationData>,
}

impl StationDataset {
    pub fn new(station: &str) -> Self {
        Self {
            station: station.to_string(),
            years: BTreeMap::new(),
        }
    }

    pub fn year(&self, year: ReferenceYear) -> Option<&StationData> {
        self.years.get(&year)
    }

    /// The table for `year`; empty when the year is missing or had no data.
    pub fn frame(&self, year: ReferenceYear) -> DataFrame {
        self.year(year)
            .map(StationData::frame)
            .unwrap_or_else(DataFrame::empty)
    }

    /// The first resolved display name across the loaded years.
    pub fn name(&self) -> &str {
        self.years
            .values()
            .map(StationData::name)
            .find(|name| *name != UNKNOWN_STATION_NAME)
            .unwrap_or(UNKNOWN_STATION_NAME)
    }
}

/// Station id → per-year normals, in the order the stations were requested.
///
/// Requested ids are not deduplicated; [`CityDataset::get`] returns the first match.
#[derive(Debug, Clone, Default)]
pub struct CityDataset {
    stations: Vec<StationDataset>,
}

impl CityDataset {
    pub fn new(stations: Vec<StationDataset>) -> Self {
        Self { stations }
    }

    pub fn get(&self, station: &str) -> Option<&StationDataset> {
        self.stations.iter().find(|s| s.station == station)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationDataset> {
        self.stations.iter()
    }

    pub fn station_ids(&self) -> Vec<&str> {
        self.stations.iter().map(|s| s.station.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl IntoIterator for CityDataset {
    type Item = StationDataset;
    type IntoIter = std::vec::IntoIter<StationDataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.stations.into_iter()
    }
}

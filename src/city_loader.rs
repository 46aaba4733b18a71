//! Loading both decades of normals for a list of stations.

use crate::store::climate_store::ClimateStore;
use crate::types::city_dataset::{CityDataset, StationDataset};
use crate::types::reference_year::ReferenceYear;
use futures_util::stream::{self, StreamExt};
use log::info;

/// Reads every requested station for each reference year through the store.
///
/// Stations are not deduplicated and keep their requested order. A station or year
/// without rows still gets an entry, holding [`crate::StationData::NoData`].
pub struct CityDataLoader<'a> {
    store: &'a ClimateStore,
    years: Vec<ReferenceYear>,
    concurrency: usize,
}

impl<'a> CityDataLoader<'a> {
    /// Loader for the 2010/2020 decade pair, one station at a time.
    pub fn new(store: &'a ClimateStore) -> Self {
        Self {
            store,
            years: ReferenceYear::DECADE_PAIR.to_vec(),
            concurrency: 1,
        }
    }

    pub fn with_years(mut self, years: &[ReferenceYear]) -> Self {
        self.years = years.to_vec();
        self
    }

    /// Stations loaded at once. Output order never depends on this.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn load(&self, stations: &[&str]) -> CityDataset {
        info!(
            "Loading {} stations for years {:?}",
            stations.len(),
            self.years
        );
        let loaded = stream::iter(stations.iter().copied())
            .map(|station| self.load_station(station))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;
        CityDataset::new(loaded)
    }

    async fn load_station(&self, station: &str) -> StationDataset {
        let mut dataset = StationDataset::new(station);
        for &year in &self.years {
            let data = self.store.read_station(station, year, None).await;
            dataset.years.insert(year, data);
        }
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::frame::test_support::{at, hourly_frame};
    use crate::frame::NORMAL_TEMP_COLUMN;
    use crate::matrix::builder::change_matrix;
    use crate::types::station_data::{NoDataReason, UNKNOWN_STATION_NAME};
    use crate::types::write_mode::WriteMode;
    use polars::prelude::*;
    use tempfile::TempDir;

    async fn seeded_store() -> Result<(TempDir, ClimateStore), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let store = ClimateStore::open(StoreConfig::in_dir(tmp.path())).await?;
        for (year, offset) in [(ReferenceYear::Y2010, 0.0), (ReferenceYear::Y2020, 1.5)] {
            let table = store.year_table(year);
            for station in ["USW00013874", "USW00094728"] {
                let values: Vec<f64> = (0..48).map(|h| 40.0 + offset + f64::from(h % 24)).collect();
                let frame = hourly_frame(station, at(1900, 1, 1, 0), &values);
                store.save_frame(&frame, &table, WriteMode::Append).await?;
            }
        }
        store
            .save_station_names(&[(
                "USW00013874".to_string(),
                "ATLANTA HARTSFIELD INTL AP, GA US".to_string(),
            )])
            .await?;
        Ok((tmp, store))
    }

    #[tokio::test]
    async fn loads_both_years_per_station() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = seeded_store().await?;
        let dataset = CityDataLoader::new(&store)
            .load(&["USW00013874", "USW00094728"])
            .await;

        assert_eq!(dataset.station_ids(), vec!["USW00013874", "USW00094728"]);
        let atlanta = dataset.get("USW00013874").unwrap();
        assert_eq!(atlanta.frame(ReferenceYear::Y2010).height(), 48);
        assert_eq!(atlanta.frame(ReferenceYear::Y2020).height(), 48);
        assert_eq!(atlanta.name(), "ATLANTA HARTSFIELD INTL AP, GA US");
        assert_eq!(
            dataset.get("USW00094728").unwrap().name(),
            UNKNOWN_STATION_NAME
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_station_gets_empty_years() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = seeded_store().await?;
        let dataset = CityDataLoader::new(&store).load(&["USW99999999"]).await;

        let missing = dataset.get("USW99999999").unwrap();
        assert_eq!(missing.years.len(), 2);
        for year in ReferenceYear::DECADE_PAIR {
            let data = missing.year(year).unwrap();
            assert_eq!(data.no_data_reason(), Some(&NoDataReason::NoRows));
            assert_eq!(data.height(), 0);
        }
        let matrix = change_matrix(
            &missing.frame(ReferenceYear::Y2010),
            &missing.frame(ReferenceYear::Y2020),
            NORMAL_TEMP_COLUMN,
            "_20",
        )?;
        assert_eq!(matrix.shape(), (24, 0));
        Ok(())
    }

    #[tokio::test]
    async fn duplicates_are_kept_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = seeded_store().await?;
        let dataset = CityDataLoader::new(&store)
            .with_years(&[ReferenceYear::Y2020])
            .load(&["USW00094728", "USW00013874", "USW00094728"])
            .await;
        assert_eq!(
            dataset.station_ids(),
            vec!["USW00094728", "USW00013874", "USW00094728"]
        );
        assert!(dataset.iter().all(|s| s.years.len() == 1));
        Ok(())
    }

    #[tokio::test]
    async fn repeated_loads_give_identical_matrices() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = seeded_store().await?;
        let loader = CityDataLoader::new(&store).with_concurrency(2);

        let mut matrices = Vec::new();
        for _ in 0..2 {
            let dataset = loader.load(&["USW00013874", "USW00094728"]).await;
            for station in dataset.iter() {
                matrices.push(change_matrix(
                    &station.frame(ReferenceYear::Y2010),
                    &station.frame(ReferenceYear::Y2020),
                    NORMAL_TEMP_COLUMN,
                    "_20",
                )?);
            }
        }
        assert_eq!(matrices[0], matrices[2]);
        assert_eq!(matrices[1], matrices[3]);
        assert_eq!(matrices[0].shape(), (24, 2));
        assert_eq!(matrices[0].get(5, 1), Some(1.5));
        Ok(())
    }

    #[tokio::test]
    async fn loaded_frames_are_time_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let (_tmp, store) = seeded_store().await?;
        let dataset = CityDataLoader::new(&store).load(&["USW00013874"]).await;
        let frame = dataset
            .get("USW00013874")
            .unwrap()
            .frame(ReferenceYear::Y2010);
        let stamps = crate::frame::naive_datetimes(frame.column("date")?)?;
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(frame.column(NORMAL_TEMP_COLUMN)?.dtype(), &DataType::Float64);
        Ok(())
    }
}

//! demos/collect_and_render.rs
//!
//! Loads two decades of NOAA hourly normals into the local store and renders the
//! 2020-minus-2010 change heatmap for each station found in both folders.
//!
//! To run this demo:
//! cargo run --example collect_and_render -- <folder_2010> <folder_2020> [out_dir]

use climate_normals::{ClimateNormals, CollectOptions, ReferenceYear, StoreConfig};
use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};

const VARIABLES: [&str; 3] = ["HLY-TEMP-NORMAL", "HLY-TEMP-10PCTL", "HLY-TEMP-90PCTL"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let (Some(folder_2010), Some(folder_2020)) = (args.next(), args.next()) else {
        eprintln!("usage: collect_and_render <folder_2010> <folder_2020> [out_dir]");
        return Ok(());
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "heatmaps".to_string()));

    let client = ClimateNormals::with_config(StoreConfig::in_dir(out_dir.join("store"))).await?;

    let mut stations = Vec::new();
    for (folder, year) in [
        (folder_2010, ReferenceYear::Y2010),
        (folder_2020, ReferenceYear::Y2020),
    ] {
        println!("Collecting {} normals from {}", year, folder);
        let collection = client
            .collect_station_csvs()
            .folder(Path::new(&folder))
            .variables(&VARIABLES)
            .options(CollectOptions {
                target_year: year,
                ..CollectOptions::default()
            })
            .call()
            .await?;
        println!(
            "{} rows from {} files ({} failed writes)",
            collection.frame.height(),
            collection.files.len(),
            collection.failed_writes.len()
        );
        stations.extend(
            collection
                .files
                .iter()
                .filter_map(|f| f.file_stem())
                .map(|stem| stem.to_string_lossy().into_owned()),
        );
    }
    stations.sort();
    stations.dedup();

    let station_refs: Vec<&str> = stations.iter().map(String::as_str).collect();
    let images = client
        .render_city_change()
        .stations(&station_refs)
        .out_dir(&out_dir)
        .call()
        .await?;
    for image in images {
        println!("Wrote {}", image.display());
    }
    Ok(())
}

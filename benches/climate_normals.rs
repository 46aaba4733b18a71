use chrono::{Duration, NaiveDate, NaiveDateTime};
use climate_normals::{change_matrix, normals_matrix, NORMAL_TEMP_COLUMN};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::*;

/// A year of hourly normals anchored to 1900, like the collector produces.
fn year_of_normals(offset: f64) -> DataFrame {
    let start: NaiveDateTime = NaiveDate::from_ymd_opt(1900, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let stamps: Vec<NaiveDateTime> = (0..8760).map(|h| start + Duration::hours(h)).collect();
    let temps: Vec<f64> = (0..8760)
        .map(|h| 55.0 + offset + 20.0 * ((h as f64) / 1400.0).sin())
        .collect();
    let date = DatetimeChunked::from_naive_datetime("date".into(), stamps, TimeUnit::Milliseconds);
    DataFrame::new(vec![
        date.into_series().into(),
        Column::new(NORMAL_TEMP_COLUMN.into(), temps),
    ])
    .unwrap()
}

fn bench_matrix(c: &mut Criterion) {
    let base = year_of_normals(0.0);
    let other = year_of_normals(1.2);
    c.bench_function("normals_matrix", |b| {
        b.iter(|| normals_matrix(black_box(&base), NORMAL_TEMP_COLUMN))
    });
    c.bench_function("change_matrix", |b| {
        b.iter(|| change_matrix(black_box(&base), black_box(&other), NORMAL_TEMP_COLUMN, "_20"))
    });
}

criterion_group!(benches, bench_matrix);
criterion_main!(benches);

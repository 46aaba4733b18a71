use crate::collector::error::CollectError;
use crate::heatmap::error::HeatmapError;
use crate::matrix::error::MatrixError;
use crate::store::error::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Heatmap(#[from] HeatmapError),

    #[error("Failed to read config file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    ConfigParse(PathBuf, #[source] serde_json::Error),

    #[error("City comparison needs exactly two stations, got {0}")]
    ComparisonNeedsTwoStations(usize),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

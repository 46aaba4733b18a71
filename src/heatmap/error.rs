use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeatmapError {
    #[error("Failed to draw heatmap: {0}")]
    Drawing(String),

    #[error("Failed to create output directory {0}: {1}")]
    OutputDir(PathBuf, #[source] std::io::Error),

    #[error("Failed to create temporary image file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Failed to keep temporary image file: {0}")]
    TempFilePersist(#[from] tempfile::PathPersistError),
}

//! FILENAME: pivot-engine/src/error.rs

use dataset::DatasetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Metric '{0}' needs a source field")]
    MissingMetricField(String),

    #[error("Invalid report definition: {0}")]
    InvalidDefinition(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

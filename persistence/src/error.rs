//! FILENAME: persistence/src/error.rs

use dataset::DatasetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Missing header row")]
    MissingHeader,
}

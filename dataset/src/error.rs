//! FILENAME: dataset/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    #[error("Row has {found} values, expected {expected}")]
    ArityMismatch { expected: usize, found: usize },
}

//! FILENAME: persistence/src/lib.rs
//! Report Persistence Module
//!
//! Loads the booking CSV into a `Dataset` and writes finished reports as
//! delimited text, one file per report.

mod error;
mod loader;
mod writer;

pub use error::PersistenceError;
pub use loader::{load_bookings, load_bookings_from_path};
pub use writer::{CsvReportWriter, DirectoryWriter, ReportWriter};

/// Extension of every written report.
pub const REPORT_EXTENSION: &str = "csv";

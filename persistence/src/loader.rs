//! FILENAME: persistence/src/loader.rs

use crate::PersistenceError;
use dataset::{Dataset, DatasetBuilder, Schema};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Loads a header-led booking CSV. Columns follow the file's header order;
/// known booking fields are coerced to their declared kind, the rest stay
/// categorical.
pub fn load_bookings<R: Read>(reader: R) -> Result<Dataset, PersistenceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PersistenceError::MissingHeader);
    }

    let mut builder = DatasetBuilder::with_headers(&headers.iter().collect::<Vec<_>>(), &Schema::bookings())?;
    for record in csv_reader.records() {
        let record = record?;
        builder.push_raw(&record.iter().collect::<Vec<_>>());
    }

    for (field, count) in builder.coercion_failures() {
        warn!("{} value(s) in '{}' could not be parsed and were coerced", count, field);
    }
    debug!("Loaded {} bookings with {} fields", builder.row_count(), headers.len());

    Ok(builder.build())
}

pub fn load_bookings_from_path(path: &Path) -> Result<Dataset, PersistenceError> {
    let file = File::open(path)?;
    load_bookings(BufReader::new(file))
}

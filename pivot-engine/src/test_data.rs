//! FILENAME: pivot-engine/src/test_data.rs
//! Small in-memory datasets shared by the unit tests.

use dataset::{fields, Dataset, DatasetBuilder, FieldKind, Schema};
use crate::binning::apply_derived_field;
use crate::definition::DerivedField;

/// hotel / origin / is_canceled:
/// (A, X, 0), (A, X, 1), (A, Y, 1), (B, X, 0)
pub fn scenario() -> Dataset {
    let schema = Schema::new()
        .with_field(fields::HOTEL, FieldKind::Categorical)
        .with_field(fields::ORIGIN, FieldKind::Categorical)
        .with_field(fields::IS_CANCELED, FieldKind::Boolean);
    let mut builder = DatasetBuilder::new(&schema);
    builder.push_raw(&["A", "X", "0"]);
    builder.push_raw(&["A", "X", "1"]);
    builder.push_raw(&["A", "Y", "1"]);
    builder.push_raw(&["B", "X", "0"]);
    builder.build()
}

pub fn scenario_with_status() -> Dataset {
    apply_derived_field(&scenario(), &DerivedField::Status).expect("is_canceled present")
}

/// Only country and is_canceled.
pub fn countries(codes: &[&str]) -> Dataset {
    let schema = Schema::new()
        .with_field(fields::COUNTRY, FieldKind::Categorical)
        .with_field(fields::IS_CANCELED, FieldKind::Boolean);
    let mut builder = DatasetBuilder::new(&schema);
    for code in codes {
        builder.push_raw(&[*code, "0"]);
    }
    builder.build()
}

/// Full booking rows: is_canceled, hotel, origin, country, tipo,
/// previous_cancellations_group, first_time_visitor, adr, dia, lead_time.
pub const BOOKING_ROWS: &[[&str; 10]] = &[
    ["0", "Resort Hotel", "Portugal", "PRT", "Leisure", "0", "Yes", "75.5", "2015-07-01", "0"],
    ["1", "Resort Hotel", "International", "GBR", "Leisure", "0", "Yes", "98.0", "2015-07-03", "14"],
    ["1", "City Hotel", "Portugal", "PRT", "Business", "1+", "No", "110.0", "2015-07-06", "120"],
    ["0", "City Hotel", "International", "FRA", "", "0", "Yes", "n/a", "2015-07-06", "400"],
    ["1", "City Hotel", "International", "DEU", "Business", "0", "Yes", "130.25", "2015-08-14", "35"],
    ["0", "Resort Hotel", "International", "ESP", "Leisure", "0", "No", "60.0", "2016-04-02", "7"],
    ["1", "City Hotel", "Portugal", "PRT", "Leisure", "1+", "Yes", "88.0", "not a date", "200"],
    ["0", "City Hotel", "International", "GBR", "", "0", "Yes", "92.0", "2016-04-04", "16"],
    ["1", "Resort Hotel", "Portugal", "PRT", "Business", "0", "No", "150.0", "2016-08-20", "bad"],
    ["0", "Resort Hotel", "International", "USA", "Leisure", "0", "Yes", "0.0", "2015-07-02", "365"],
];

pub fn bookings() -> Dataset {
    let mut builder = DatasetBuilder::new(&Schema::bookings());
    for row in BOOKING_ROWS {
        builder.push_raw(row);
    }
    builder.build()
}

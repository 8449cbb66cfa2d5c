//! FILENAME: tests/common/mod.rs
//! Fixtures and helpers for report engine integration tests.

#![allow(dead_code)]

use dataset::{fields, Dataset, DatasetBuilder, FieldKind, Schema};
use pivot_engine::ReportView;

/// Ten bookings over two hotels, four stay weeks and every lead-time bucket.
pub struct BookingFixture;

impl BookingFixture {
    pub fn headers() -> Vec<&'static str> {
        vec![
            "is_canceled",
            "hotel",
            "origin",
            "country",
            "tipo",
            "previous_cancellations_group",
            "first_time_visitor",
            "adr",
            "dia",
            "lead_time",
        ]
    }

    /// Row 7 has no usable ADR, row 8 no usable stay date, row 10 no trip type.
    pub fn data() -> Vec<[&'static str; 10]> {
        vec![
            ["0", "City Hotel", "Portugal", "PRT", "Leisure", "0", "Yes", "100.0", "2015-07-06", "0"],
            ["1", "City Hotel", "Portugal", "PRT", "Leisure", "0", "Yes", "120.0", "2015-07-08", "5"],
            ["1", "City Hotel", "International", "GBR", "Business", "0", "No", "90.0", "2015-07-12", "10"],
            ["0", "City Hotel", "International", "FRA", "Leisure", "1+", "Yes", "80.0", "2015-07-13", "20"],
            ["1", "Resort Hotel", "Portugal", "PRT", "Leisure", "0", "Yes", "60.0", "2015-07-14", "40"],
            ["1", "Resort Hotel", "International", "GBR", "Leisure", "0", "No", "70.0", "2015-08-03", "100"],
            ["0", "Resort Hotel", "International", "DEU", "Business", "0", "Yes", "n/a", "2015-08-04", "200"],
            ["1", "Resort Hotel", "Portugal", "PRT", "Business", "1+", "Yes", "150.0", "not a date", "400"],
            ["0", "City Hotel", "International", "ESP", "Leisure", "0", "Yes", "110.0", "2015-08-05", "400"],
            ["1", "City Hotel", "International", "USA", "", "0", "No", "95.0", "2016-01-04", "30"],
        ]
    }

    pub fn dataset() -> Dataset {
        let mut builder = DatasetBuilder::with_headers(&Self::headers(), &Schema::bookings())
            .expect("fixture headers are unique");
        for row in Self::data() {
            builder.push_raw(&row);
        }
        builder.build()
    }
}

/// hotel / origin / is_canceled:
/// (A, X, 0), (A, X, 1), (A, Y, 1), (B, X, 0)
pub fn scenario() -> Dataset {
    let schema = Schema::new()
        .with_field(fields::HOTEL, FieldKind::Categorical)
        .with_field(fields::ORIGIN, FieldKind::Categorical)
        .with_field(fields::IS_CANCELED, FieldKind::Boolean);
    let mut builder = DatasetBuilder::new(&schema);
    for row in [["A", "X", "0"], ["A", "X", "1"], ["A", "Y", "1"], ["B", "X", "0"]] {
        builder.push_raw(&row);
    }
    builder.build()
}

/// Every row of a view, rendered.
pub fn rendered(view: &ReportView) -> Vec<Vec<String>> {
    view.rows
        .iter()
        .map(|row| row.iter().map(|c| c.render()).collect())
        .collect()
}

/// Rendered cell of the row whose `key_columns` render as `key`.
pub fn lookup(view: &ReportView, key_columns: &[&str], key: &[&str], column: &str) -> String {
    let col = view
        .column_index(column)
        .unwrap_or_else(|| panic!("no column {} in {:?}", column, view.columns));
    let row = view
        .find_row(key_columns, key)
        .unwrap_or_else(|| panic!("no row {:?} in {}", key, view.name));
    row[col].render()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//! FILENAME: tests/report_pipeline.rs
//! Integration tests for status, rate and ADR reports.

mod common;

use common::{lookup, rendered, scenario, strings, BookingFixture};
use pivot_engine::presets::{
    adr_distribution, adr_summary, cancel_rate, restricted, segment_summary, status_breakdown,
    status_breakdown_long, top_countries_filter,
};
use pivot_engine::{run_catalog, run_report, EngineError, ReportCell, ReportSpec};

// ============================================================================
// STATUS BREAKDOWNS
// ============================================================================

#[test]
fn test_status_pivot_with_totals_end_to_end() {
    let ds = scenario();
    let view = run_report(&ds, &status_breakdown("by_hotel_origin", &["hotel", "origin"])).unwrap();

    assert_eq!(
        view.columns,
        strings(&["Hotel", "Origin", "Canceled", "Not Canceled", "Canceled %", "Not Canceled %"])
    );
    assert_eq!(
        rendered(&view),
        vec![
            strings(&["A", "X", "1", "1", "50.0", "50.0"]),
            strings(&["A", "Y", "1", "0", "100.0", "0.0"]),
            strings(&["B", "X", "0", "1", "0.0", "100.0"]),
            strings(&["A", "Total", "2", "1", "66.67", "33.33"]),
            strings(&["B", "Total", "0", "1", "0.0", "100.0"]),
        ]
    );
}

#[test]
fn test_percentages_match_counts() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &status_breakdown("by_hotel_tipo", &["hotel", "tipo"])).unwrap();
    assert!(!view.is_empty());

    for row in 0..view.row_count() {
        let count = |c: &str| view.cell(row, c).and_then(|v| v.as_f64()).unwrap();
        let total = count("Canceled") + count("Not Canceled");
        let expected = (count("Canceled") / total * 10000.0).round() / 100.0;
        assert_eq!(count("Canceled %"), expected);
        assert!((count("Canceled %") + count("Not Canceled %") - 100.0).abs() < 0.011);
    }
}

#[test]
fn test_basic_breakdown_without_dimensions() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &status_breakdown("01_cancellation_basic", &[])).unwrap();
    assert_eq!(view.columns, strings(&["Status", "Value", "Percentage"]));
    assert_eq!(
        rendered(&view),
        vec![
            strings(&["Canceled", "6", "60.0"]),
            strings(&["Not canceled", "4", "40.0"]),
        ]
    );
}

#[test]
fn test_long_breakdown_puts_totals_last() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &status_breakdown_long("03_long", &["origin"])).unwrap();
    assert_eq!(view.columns, strings(&["Origin", "Status", "Count", "Percentage"]));
    assert_eq!(
        rendered(&view),
        vec![
            strings(&["International", "Canceled", "3", "50.0"]),
            strings(&["International", "Not canceled", "3", "50.0"]),
            strings(&["Portugal", "Canceled", "3", "75.0"]),
            strings(&["Portugal", "Not canceled", "1", "25.0"]),
            strings(&["Total", "Canceled", "6", "60.0"]),
            strings(&["Total", "Not canceled", "4", "40.0"]),
        ]
    );
}

#[test]
fn test_country_reports_keep_listed_countries_only() {
    let ds = BookingFixture::dataset();
    let spec = restricted(status_breakdown("04_by_country", &["country"]), top_countries_filter());
    let view = run_report(&ds, &spec).unwrap();
    assert_eq!(view.column_values("Country"), strings(&["DEU", "ESP", "FRA", "GBR", "PRT"]));
    assert_eq!(lookup(&view, &["Country"], &["PRT"], "Canceled"), "3");
    assert_eq!(lookup(&view, &["Country"], &["PRT"], "Canceled %"), "75.0");
    // the source dataset still has every booking
    assert_eq!(ds.len(), 10);
}

// ============================================================================
// RATES & SUMMARIES
// ============================================================================

#[test]
fn test_cancel_rate_by_status_when_ungrouped() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &cancel_rate("rate", &[])).unwrap();
    assert_eq!(view.columns, strings(&["Status", "cancel_rate", "total", "canceled"]));
    assert_eq!(
        rendered(&view),
        vec![
            strings(&["Canceled", "100.0", "6", "6"]),
            strings(&["Not canceled", "0.0", "4", "0"]),
        ]
    );
}

#[test]
fn test_cancel_rate_counts_cover_grouped_rows() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &cancel_rate("rate", &["hotel", "tipo"])).unwrap();
    assert_eq!(view.columns, strings(&["hotel", "tipo", "cancel_rate", "total", "canceled"]));

    let total: i64 = view
        .rows
        .iter()
        .map(|r| match r[3] {
            ReportCell::Integer(n) => n,
            _ => panic!("total is not an integer"),
        })
        .sum();
    // one booking has no trip type
    assert_eq!(total, 9);
}

#[test]
fn test_segment_summary() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &segment_summary("53_segment", &["hotel"])).unwrap();
    assert_eq!(
        view.columns,
        strings(&[
            "hotel",
            "total_bookings",
            "canceled_bookings",
            "cancel_rate",
            "not_canceled_bookings",
            "adr_mean",
            "adr_median",
        ])
    );
    assert_eq!(
        rendered(&view),
        vec![
            strings(&["City Hotel", "6", "3", "50.0", "3", "99.17", "97.5"]),
            strings(&["Resort Hotel", "4", "3", "75.0", "1", "93.33", "70.0"]),
        ]
    );
}

#[test]
fn test_adr_listing_skips_invalid_adr() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &adr_distribution("adr_all", &[])).unwrap();
    assert_eq!(view.columns, strings(&["group", "adr"]));
    assert_eq!(view.row_count(), 9);
    assert!(view.column_values("group").iter().all(|g| g == "All"));
    assert_eq!(view.rows[0][1], ReportCell::Decimal(100.0));

    let by_tipo = run_report(&ds, &adr_distribution("adr_tipo", &["tipo"])).unwrap();
    // row 10 has no trip type but keeps its ADR
    assert_eq!(by_tipo.row_count(), 9);
    assert_eq!(lookup(&by_tipo, &["tipo"], &[""], "adr"), "95.0");
}

#[test]
fn test_adr_summary_is_melted() {
    let ds = BookingFixture::dataset();
    let view = run_report(&ds, &adr_summary("adr_summary", &["hotel"])).unwrap();
    assert_eq!(view.columns, strings(&["hotel", "statistic", "value"]));
    assert_eq!(view.row_count(), 12);

    let statistics = view.column_values("statistic");
    assert_eq!(&statistics[..2], &strings(&["mean", "mean"])[..]);
    assert_eq!(&statistics[10..], &strings(&["count", "count"])[..]);
    assert_eq!(lookup(&view, &["hotel", "statistic"], &["City Hotel", "mean"], "value"), "99.17");
    assert_eq!(lookup(&view, &["hotel", "statistic"], &["Resort Hotel", "max"], "value"), "150.0");
    assert_eq!(lookup(&view, &["hotel", "statistic"], &["Resort Hotel", "count"], "value"), "3");

    let all = run_report(&ds, &adr_summary("adr_summary_all", &[])).unwrap();
    assert_eq!(all.columns, strings(&["group", "statistic", "value"]));
    assert_eq!(all.row_count(), 6);
    assert_eq!(lookup(&all, &["statistic"], &["min"], "value"), "60.0");
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_catalog_from_json() {
    let json = r#"[
        {
            "name": "by_hotel",
            "group_by": ["hotel"],
            "metrics": [
                { "name": "total", "aggregation": "Count", "format": "Integer" },
                { "name": "canceled", "field": "is_canceled", "aggregation": "Sum", "format": "Integer" }
            ],
            "derived_metrics": [
                { "Ratio": { "name": "cancel_rate", "numerator": "canceled", "denominator": "total" } }
            ],
            "output": { "display_names": true }
        },
        {
            "name": "by_origin",
            "derived_fields": ["Status"],
            "group_by": ["origin", "Status"],
            "metrics": [ { "name": "count", "aggregation": "Count", "format": "Integer" } ],
            "pivot": { "dimension": "Status", "values": [ { "metric": "count" } ] }
        }
    ]"#;

    let specs = ReportSpec::catalog_from_json(json).unwrap();
    let views = run_catalog(&scenario(), &specs).unwrap();

    assert_eq!(views[0].columns, strings(&["Hotel", "total", "canceled", "% Cancellations"]));
    assert_eq!(lookup(&views[0], &["Hotel"], &["A"], "% Cancellations"), "66.67");
    assert_eq!(views[1].columns, strings(&["origin", "Canceled", "Not canceled"]));
    assert_eq!(rendered(&views[1]), vec![strings(&["X", "1", "2"]), strings(&["Y", "1", "0"])]);
}

#[test]
fn test_missing_field_is_an_error() {
    let ds = scenario();
    let err = run_report(&ds, &segment_summary("segment", &["hotel"])).unwrap_err();
    assert!(matches!(err, EngineError::Dataset(_)));
}

//! FILENAME: pivot-engine/src/presets.rs
//! Report presets - ReportSpec constructors for every booking report kind.
//!
//! Each constructor only fills in a `ReportSpec`; the work is done by the
//! generic pipeline in `engine.rs`. The catalogs at the bottom list the
//! full published report sets.

use dataset::fields;
use crate::binning::STATUS_CANCELED;
use crate::definition::{
    AggregationType, ColumnNaming, ConstantColumn, DerivedField, DerivedMetric, MeltSpec,
    MetricFormat, MetricSpec, PivotRate, PivotSpec, PivotValue, ReportShape, ReportSpec,
    RollupSpec, RowFilter, TotalPlacement,
};

/// Countries kept by the country-level reports.
pub const TOP_COUNTRIES: [&str; 5] = ["PRT", "GBR", "FRA", "ESP", "DEU"];

/// How many countries the "most frequent" temporal report keeps.
pub const MOST_FREQUENT_COUNTRIES: usize = 10;

/// Dimension whose values get a synthetic Total row.
pub const ROLLUP_DIMENSION: &str = fields::ORIGIN;

pub const CONSTANT_GROUP_COLUMN: &str = "group";
pub const CONSTANT_GROUP_VALUE: &str = "All";

// ============================================================================
// HELPERS
// ============================================================================

fn names(dims: &[&str]) -> Vec<String> {
    dims.iter().map(|d| d.to_string()).collect()
}

fn with_dims(dims: &[&str], extra: &[&str]) -> Vec<String> {
    dims.iter().chain(extra).map(|d| d.to_string()).collect()
}

/// The other dimensions first, then origin (if grouped).
fn origin_last(dims: &[&str]) -> Vec<String> {
    let mut order: Vec<String> = dims
        .iter()
        .filter(|d| **d != ROLLUP_DIMENSION)
        .map(|d| d.to_string())
        .collect();
    if dims.contains(&ROLLUP_DIMENSION) {
        order.push(ROLLUP_DIMENSION.to_string());
    }
    order
}

/// `origin` is derived from `country` for datasets that lack it.
fn origin_field_for(dims: &[&str]) -> Vec<DerivedField> {
    if dims.contains(&fields::ORIGIN) {
        vec![DerivedField::Origin]
    } else {
        Vec::new()
    }
}

fn trailing_rollup_for(dims: &[&str]) -> Option<RollupSpec> {
    dims.contains(&ROLLUP_DIMENSION)
        .then(|| RollupSpec::new(ROLLUP_DIMENSION, TotalPlacement::Trailing))
}

fn canceled_metric(name: &str) -> MetricSpec {
    MetricSpec::new(name, fields::IS_CANCELED, AggregationType::Sum).with_format(MetricFormat::Integer)
}

fn rate(name: &str, numerator: &str, denominator: &str) -> DerivedMetric {
    DerivedMetric::Ratio {
        name: name.to_string(),
        numerator: numerator.to_string(),
        denominator: denominator.to_string(),
    }
}

fn share(name: &str, source: &str, within: Vec<String>) -> DerivedMetric {
    DerivedMetric::ShareOfGroup {
        name: name.to_string(),
        source: source.to_string(),
        within,
    }
}

/// total, canceled and cancel_rate.
fn cancel_rate_metrics(spec: &mut ReportSpec) {
    spec.metrics = vec![MetricSpec::row_count("total"), canceled_metric("canceled")];
    spec.derived_metrics = vec![rate("cancel_rate", "canceled", "total")];
}

fn constant_group() -> ConstantColumn {
    ConstantColumn {
        column: CONSTANT_GROUP_COLUMN.to_string(),
        value: CONSTANT_GROUP_VALUE.to_string(),
    }
}

/// Restricts a report to the fixed country list.
pub fn top_countries_filter() -> RowFilter {
    RowFilter::In {
        field: fields::COUNTRY.to_string(),
        values: names(&TOP_COUNTRIES),
    }
}

/// Restricts a report to the most frequent countries of the whole dataset.
pub fn most_frequent_countries_filter() -> RowFilter {
    RowFilter::TopValues {
        field: fields::COUNTRY.to_string(),
        count: MOST_FREQUENT_COUNTRIES,
    }
}

/// Applies `filter` before the report's own filters.
pub fn restricted(mut spec: ReportSpec, filter: RowFilter) -> ReportSpec {
    spec.filters.insert(0, filter);
    spec
}

// ============================================================================
// STATUS BREAKDOWNS
// ============================================================================

/// Canceled / not canceled counts and shares per group, wide.
///
/// Columns `dims…, Canceled, Not Canceled, Canceled %, Not Canceled %`.
/// With no dimensions: `Status, Value, Percentage`. Grouping by origin adds
/// Total rows after every named row.
pub fn status_breakdown(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = ReportSpec::new(name);
    spec.derived_fields = origin_field_for(dims);
    spec.derived_fields.push(DerivedField::Status);
    spec.output.display_names = true;

    if dims.is_empty() {
        spec.group_by = names(&[fields::STATUS]);
        spec.metrics = vec![MetricSpec::row_count("Value")];
        spec.derived_metrics = vec![share("Percentage", "Value", Vec::new())];
        return spec;
    }

    spec.group_by = with_dims(dims, &[fields::STATUS]);
    spec.metrics = vec![MetricSpec::row_count("count")];
    spec.derived_metrics = vec![share("percentage", "count", names(dims))];
    spec.rollup = trailing_rollup_for(dims);
    spec.pivot = Some(
        PivotSpec::new(
            fields::STATUS,
            vec![PivotValue::value("count"), PivotValue::percentage("percentage")],
        )
        .with_naming(ColumnNaming::StatusMetric),
    );
    spec.output.sort_by = Some(origin_last(dims));
    spec
}

/// Long variant: `dims…, Status, Count, Percentage`.
pub fn status_breakdown_long(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = ReportSpec::new(name);
    spec.derived_fields = origin_field_for(dims);
    spec.derived_fields.push(DerivedField::Status);
    spec.group_by = with_dims(dims, &[fields::STATUS]);
    spec.metrics = vec![MetricSpec::row_count("count")];
    spec.derived_metrics = vec![share("percentage", "count", names(dims))];
    spec.rollup = trailing_rollup_for(dims);

    let mut order = origin_last(dims);
    order.push(fields::STATUS.to_string());
    spec.output.sort_by = Some(order);
    spec.output.display_names = true;
    spec
}

// ============================================================================
// RATES & SUMMARIES
// ============================================================================

/// `dims…, cancel_rate, total, canceled`. With no dimensions the rows are
/// per status.
pub fn cancel_rate(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = ReportSpec::new(name);
    spec.derived_fields = origin_field_for(dims);
    let group: Vec<&str> = if dims.is_empty() {
        spec.derived_fields.push(DerivedField::Status);
        vec![fields::STATUS]
    } else {
        dims.to_vec()
    };
    spec.group_by = names(&group);
    cancel_rate_metrics(&mut spec);
    spec.output.columns = Some(with_dims(&group, &["cancel_rate", "total", "canceled"]));
    spec
}

/// Booking counts, cancellation rate and ADR centre per segment.
pub fn segment_summary(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = ReportSpec::new(name);
    spec.derived_fields = origin_field_for(dims);
    spec.group_by = names(dims);
    spec.metrics = vec![
        MetricSpec::row_count("total_bookings"),
        canceled_metric("canceled_bookings"),
        MetricSpec::new("adr_mean", fields::ADR, AggregationType::Mean),
        MetricSpec::new("adr_median", fields::ADR, AggregationType::Median),
    ];
    spec.derived_metrics = vec![
        rate("cancel_rate", "canceled_bookings", "total_bookings"),
        DerivedMetric::Difference {
            name: "not_canceled_bookings".to_string(),
            minuend: "total_bookings".to_string(),
            subtrahend: "canceled_bookings".to_string(),
        },
    ];
    spec.output.columns = Some(with_dims(
        dims,
        &[
            "total_bookings",
            "canceled_bookings",
            "cancel_rate",
            "not_canceled_bookings",
            "adr_mean",
            "adr_median",
        ],
    ));
    spec
}

/// One row per booking with a valid ADR: `dims…, adr`.
pub fn adr_distribution(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = ReportSpec::new(name);
    spec.derived_fields = origin_field_for(dims);
    spec.shape = ReportShape::Listing {
        value_field: fields::ADR.to_string(),
    };
    spec.group_by = names(dims);
    if dims.is_empty() {
        spec.output.constant_column = Some(constant_group());
    }
    spec
}

/// ADR statistics melted into `dims…, statistic, value` rows.
pub fn adr_summary(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = ReportSpec::new(name).with_filter(RowFilter::NotNull {
        field: fields::ADR.to_string(),
    });
    spec.derived_fields = origin_field_for(dims);
    spec.group_by = names(dims);
    spec.metrics = [
        AggregationType::Mean,
        AggregationType::Median,
        AggregationType::StdDev,
        AggregationType::Min,
        AggregationType::Max,
        AggregationType::Count,
    ]
    .iter()
    .map(|&agg| MetricSpec::new(agg.statistic_name(), fields::ADR, agg))
    .collect();
    spec.output.melt = Some(MeltSpec {
        variable: "statistic".to_string(),
        value: "value".to_string(),
    });
    if dims.is_empty() {
        spec.output.constant_column = Some(constant_group());
    }
    spec
}

// ============================================================================
// TEMPORAL
// ============================================================================

/// Calendar bucket for temporal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
}

impl Period {
    fn derived_field(&self) -> DerivedField {
        let source = fields::DIA.to_string();
        match self {
            Period::Week => DerivedField::Week { source },
            Period::Month => DerivedField::Month { source },
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Period::Week => fields::WEEK,
            Period::Month => fields::MONTH_NAME,
        }
    }
}

fn temporal(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = ReportSpec::new(name).with_filter(RowFilter::NotNull {
        field: fields::DIA.to_string(),
    });
    spec.derived_fields = origin_field_for(dims);
    spec
}

/// Bookings per stay date: `dims…, <one column per date>`.
pub fn daily_bookings(name: &str, dims: &[&str]) -> ReportSpec {
    let mut spec = temporal(name, dims);
    spec.group_by = with_dims(dims, &[fields::DIA]);
    spec.metrics = vec![MetricSpec::row_count("bookings")];
    spec.pivot = Some(PivotSpec::new(fields::DIA, vec![PivotValue::value("bookings")]));
    spec
}

/// Bookings per week start (or month): `dims…, <one column per period>`.
pub fn period_bookings(name: &str, dims: &[&str], period: Period) -> ReportSpec {
    let mut spec = temporal(name, dims);
    spec.derived_fields.push(period.derived_field());
    spec.group_by = with_dims(dims, &[period.field()]);
    spec.metrics = vec![MetricSpec::row_count("bookings")];
    spec.pivot = Some(PivotSpec::new(period.field(), vec![PivotValue::value("bookings")]));
    spec
}

/// `dims…, week, Canceled, Not canceled, total, cancel_rate`.
pub fn period_status(name: &str, dims: &[&str], period: Period) -> ReportSpec {
    let mut spec = temporal(name, dims);
    spec.derived_fields.push(period.derived_field());
    spec.derived_fields.push(DerivedField::Status);
    spec.group_by = with_dims(dims, &[period.field(), fields::STATUS]);
    spec.metrics = vec![MetricSpec::row_count("count")];

    let mut pivot = PivotSpec::new(fields::STATUS, vec![PivotValue::value("count")]);
    pivot.row_total = Some("total".to_string());
    pivot.rate = Some(PivotRate {
        name: "cancel_rate".to_string(),
        numerator: STATUS_CANCELED.to_string(),
    });
    spec.pivot = Some(pivot);
    spec
}

/// What a timeline cell holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineMetric {
    Bookings,
    CancelRate,
}

/// Weekly series with the dimensions joined into one `Label` column
/// (`City Hotel-Portugal`), one column per week start.
pub fn timeline(name: &str, dims: &[&str], metric: TimelineMetric) -> ReportSpec {
    let mut spec = period_bookings(name, dims, Period::Week);
    if metric == TimelineMetric::CancelRate {
        cancel_rate_metrics(&mut spec);
        spec.pivot = Some(PivotSpec::new(fields::WEEK, vec![PivotValue::value("cancel_rate")]));
    }
    spec.output.label_column = Some("Label".to_string());
    spec
}

// ============================================================================
// BUCKETED RATES
// ============================================================================

/// `Lead Time, Hotel, Origin, % Cancellations`, a Total row after each
/// (lead time, hotel) block.
pub fn lead_time_cancel_rate(name: &str) -> ReportSpec {
    let dims = [fields::LEAD_TIME_GROUP, fields::HOTEL, fields::ORIGIN];
    let mut spec = ReportSpec::new(name);
    spec.derived_fields = vec![DerivedField::Origin, DerivedField::LeadTimeGroup];
    spec.group_by = names(&dims);
    cancel_rate_metrics(&mut spec);
    spec.rollup = Some(RollupSpec::new(ROLLUP_DIMENSION, TotalPlacement::PerGroup));
    spec.output.columns = Some(with_dims(&dims, &["cancel_rate"]));
    spec.output.display_names = true;
    spec
}

/// `Origin, Month, % Cancellations <hotel>…`, months in calendar order,
/// Total after the origins of each month.
pub fn monthly_cancel_rate_by_hotel(name: &str) -> ReportSpec {
    let mut spec = ReportSpec::new(name).with_filter(RowFilter::NotNull {
        field: fields::DIA.to_string(),
    });
    spec.derived_fields = vec![DerivedField::Origin, Period::Month.derived_field()];
    spec.group_by = names(&[fields::ORIGIN, fields::MONTH_NAME, fields::HOTEL]);
    cancel_rate_metrics(&mut spec);
    spec.rollup = Some(RollupSpec::new(ROLLUP_DIMENSION, TotalPlacement::PerGroup));
    spec.pivot = Some(
        PivotSpec::new(fields::HOTEL, vec![PivotValue::value("cancel_rate")])
            .with_naming(ColumnNaming::Prefixed("% Cancellations ".to_string())),
    );
    spec.output.sort_by = Some(names(&[fields::MONTH_NAME, fields::ORIGIN]));
    spec.output.display_names = true;
    spec
}

// ============================================================================
// CATALOGS
// ============================================================================

const STATUS_GROUPINGS: &[(&str, &[&str], bool)] = &[
    ("01_cancellation_basic", &[], false),
    ("02_cancellation_by_hotel", &["hotel"], false),
    ("03_cancellation_by_origin", &["origin"], false),
    ("04_cancellation_by_country", &["country"], true),
    ("05_cancellation_by_first_time_visitor", &["first_time_visitor"], false),
    ("06_cancellation_by_previous_cancellations", &["previous_cancellations_group"], false),
    ("07_cancellation_by_tipo", &["tipo"], false),
    ("08_cancellation_by_hotel_origin", &["hotel", "origin"], false),
    ("09_cancellation_by_hotel_country", &["hotel", "country"], true),
    ("10_cancellation_by_origin_country", &["origin", "country"], true),
    ("11_cancellation_by_hotel_first_time_visitor", &["hotel", "first_time_visitor"], false),
    ("12_cancellation_by_origin_first_time_visitor", &["origin", "first_time_visitor"], false),
    ("13_cancellation_by_hotel_previous_cancellations", &["hotel", "previous_cancellations_group"], false),
    ("14_cancellation_by_origin_previous_cancellations", &["origin", "previous_cancellations_group"], false),
    ("15_cancellation_by_hotel_tipo", &["hotel", "tipo"], false),
    ("16_cancellation_by_origin_tipo", &["origin", "tipo"], false),
    ("17_cancellation_by_first_time_previous_cancellations", &["first_time_visitor", "previous_cancellations_group"], false),
    ("18_cancellation_by_hotel_origin_tipo", &["hotel", "origin", "tipo"], false),
    ("18b_cancellation_by_hotel_country_tipo", &["hotel", "country", "tipo"], true),
    ("19_cancellation_by_hotel_origin_first_time_visitor", &["hotel", "origin", "first_time_visitor"], false),
    ("20_cancellation_by_hotel_origin_previous_cancellations", &["hotel", "origin", "previous_cancellations_group"], false),
    ("21_cancellation_by_hotel_origin_country", &["hotel", "origin", "country"], true),
    ("22_cancellation_by_hotel_tipo_previous_cancellations", &["hotel", "tipo", "previous_cancellations_group"], false),
    ("23_cancellation_by_origin_tipo_previous_cancellations", &["origin", "tipo", "previous_cancellations_group"], false),
    ("24_cancellation_by_hotel_origin_tipo_previous_cancellations", &["hotel", "origin", "tipo", "previous_cancellations_group"], false),
];

fn status_catalog(build: fn(&str, &[&str]) -> ReportSpec) -> Vec<ReportSpec> {
    STATUS_GROUPINGS
        .iter()
        .map(|(name, dims, by_country)| {
            let spec = build(name, dims);
            if *by_country {
                restricted(spec, top_countries_filter())
            } else {
                spec
            }
        })
        .collect()
}

/// The wide report set: status breakdowns, temporal pivots, rates, ADR,
/// segment summaries and the bucketed rate tables.
pub fn standard_catalog() -> Vec<ReportSpec> {
    let mut catalog = status_catalog(status_breakdown);

    catalog.push(daily_bookings("25_temporal_bookings_by_country_origin", &["country", "origin"]));
    catalog.push(restricted(
        daily_bookings("26_temporal_bookings_top10_countries", &["country", "origin"]),
        most_frequent_countries_filter(),
    ));
    catalog.push(daily_bookings("27_temporal_bookings_by_origin", &["origin"]));
    catalog.push(daily_bookings("28_temporal_bookings_by_hotel_origin", &["hotel", "origin"]));

    let rates: &[(&str, &[&str])] = &[
        ("29_cancel_rate_hotel_origin_tipo", &["hotel", "origin", "tipo"]),
        ("30_cancel_rate_hotel_origin", &["hotel", "origin"]),
        ("31_cancel_rate_origin_tipo", &["origin", "tipo"]),
        ("32_cancel_rate_hotel_tipo", &["hotel", "tipo"]),
        ("33_cancel_rate_previous_cancellations", &["previous_cancellations_group"]),
        ("34_cancel_rate_hotel_previous_cancellations", &["hotel", "previous_cancellations_group"]),
        ("35_cancel_rate_origin_previous_cancellations", &["origin", "previous_cancellations_group"]),
    ];
    catalog.extend(rates.iter().map(|(name, dims)| cancel_rate(name, dims)));

    let adr: &[(&str, &[&str])] = &[
        ("36_adr_by_tipo", &["tipo"]),
        ("37_adr_by_hotel_tipo", &["hotel", "tipo"]),
        ("38_adr_by_origin_tipo", &["origin", "tipo"]),
        ("39_adr_by_hotel_origin_tipo", &["hotel", "origin", "tipo"]),
        ("40_adr_by_hotel", &["hotel"]),
        ("41_adr_by_origin", &["origin"]),
        ("42_adr_by_hotel_origin", &["hotel", "origin"]),
        ("43_adr_by_previous_cancellations", &["previous_cancellations_group"]),
    ];
    catalog.extend(adr.iter().map(|(name, dims)| adr_distribution(name, dims)));

    let adr_summaries: &[(&str, &[&str])] = &[
        ("44_adr_summary_by_tipo", &["tipo"]),
        ("45_adr_summary_by_hotel_tipo", &["hotel", "tipo"]),
        ("46_adr_summary_by_origin_tipo", &["origin", "tipo"]),
    ];
    catalog.extend(adr_summaries.iter().map(|(name, dims)| adr_summary(name, dims)));

    catalog.push(period_bookings("47_weekly_bookings_by_origin", &["origin"], Period::Week));
    catalog.push(period_bookings("48_weekly_bookings_by_hotel_origin", &["hotel", "origin"], Period::Week));
    catalog.push(period_bookings("49_weekly_bookings_by_hotel", &["hotel"], Period::Week));
    catalog.push(period_status("50_weekly_cancellations_by_origin", &["origin"], Period::Week));
    catalog.push(period_status("51_weekly_cancellations_by_hotel_origin", &["hotel", "origin"], Period::Week));

    let segments: &[(&str, &[&str])] = &[
        ("52_segment_summary_hotel_origin_tipo", &["hotel", "origin", "tipo"]),
        ("53_segment_summary_hotel_origin", &["hotel", "origin"]),
        ("54_segment_summary_previous_cancellations", &["previous_cancellations_group"]),
        ("55_segment_summary_hotel_previous_cancellations", &["hotel", "previous_cancellations_group"]),
        ("56_segment_summary_origin_previous_cancellations", &["origin", "previous_cancellations_group"]),
    ];
    catalog.extend(segments.iter().map(|(name, dims)| segment_summary(name, dims)));

    catalog.push(lead_time_cancel_rate("57_lead_time_hotel_origin_cancel_rate"));
    catalog.push(monthly_cancel_rate_by_hotel("58_hotel_origin_month_cancel_rate"));
    catalog
}

/// The long-format status breakdowns, same groupings as the wide set.
pub fn long_catalog() -> Vec<ReportSpec> {
    status_catalog(status_breakdown_long)
}

/// Weekly timelines by hotel/origin/country, bookings and cancel rate.
pub fn timeline_catalog() -> Vec<ReportSpec> {
    let series: &[(&str, &[&str], TimelineMetric, bool)] = &[
        ("01_timeline_hotel_origin_bookings", &["hotel", "origin"], TimelineMetric::Bookings, false),
        ("02_timeline_hotel_country_bookings", &["hotel", "country"], TimelineMetric::Bookings, true),
        ("03_timeline_hotel_origin_cancel_rate", &["hotel", "origin"], TimelineMetric::CancelRate, false),
        ("04_timeline_hotel_country_cancel_rate", &["hotel", "country"], TimelineMetric::CancelRate, true),
        ("05_timeline_origin_bookings", &["origin"], TimelineMetric::Bookings, false),
        ("06_timeline_country_bookings", &["country"], TimelineMetric::Bookings, true),
        ("07_timeline_origin_cancel_rate", &["origin"], TimelineMetric::CancelRate, false),
        ("08_timeline_country_cancel_rate", &["country"], TimelineMetric::CancelRate, true),
    ];
    series
        .iter()
        .map(|(name, dims, metric, by_country)| {
            let spec = timeline(name, dims, *metric);
            if *by_country {
                restricted(spec, top_countries_filter())
            } else {
                spec
            }
        })
        .collect()
}

//! FILENAME: pivot-engine/src/definition.rs
//! Report Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a report.
//! These structures are designed to be:
//! - Serializable (loadable from JSON report catalogs)
//! - Independent of any particular dataset
//! - Immutable snapshots of caller intent
//!
//! One `ReportSpec` is processed by one generic pipeline; there is no
//! per-report code path.

use serde::{Deserialize, Serialize};
use crate::error::EngineError;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    Count,
    Sum,
    Mean,
    Median,
    /// Sample standard deviation (n - 1).
    StdDev,
    Min,
    Max,
}

impl Default for AggregationType {
    fn default() -> Self {
        AggregationType::Count
    }
}

impl AggregationType {
    /// Short statistic name, as used in melted summaries.
    pub fn statistic_name(&self) -> &'static str {
        match self {
            AggregationType::Count => "count",
            AggregationType::Sum => "sum",
            AggregationType::Mean => "mean",
            AggregationType::Median => "median",
            AggregationType::StdDev => "std",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
        }
    }
}

/// How a metric renders: whole counts or 2-decimal figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricFormat {
    Integer,
    Decimal,
}

impl Default for MetricFormat {
    fn default() -> Self {
        MetricFormat::Decimal
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// A metric computed from raw records of each group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Output column name.
    pub name: String,

    /// Source field. `None` is only valid for `Count`, which then counts rows.
    #[serde(default)]
    pub field: Option<String>,

    pub aggregation: AggregationType,

    #[serde(default)]
    pub format: MetricFormat,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>, field: impl Into<String>, aggregation: AggregationType) -> Self {
        MetricSpec {
            name: name.into(),
            field: Some(field.into()),
            aggregation,
            format: match aggregation {
                AggregationType::Count => MetricFormat::Integer,
                _ => MetricFormat::Decimal,
            },
        }
    }

    /// Number of records in the group.
    pub fn row_count(name: impl Into<String>) -> Self {
        MetricSpec {
            name: name.into(),
            field: None,
            aggregation: AggregationType::Count,
            format: MetricFormat::Integer,
        }
    }

    pub fn with_format(mut self, format: MetricFormat) -> Self {
        self.format = format;
        self
    }
}

/// A metric computed from other metrics of the same row.
/// Always evaluated from raw accumulators, so rollup rows get exact values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DerivedMetric {
    /// `source / sum(source over rows sharing `within`) * 100`.
    ShareOfGroup {
        name: String,
        source: String,
        within: Vec<String>,
    },
    /// `numerator / denominator * 100`.
    Ratio {
        name: String,
        numerator: String,
        denominator: String,
    },
    /// `minuend - subtrahend`.
    Difference {
        name: String,
        minuend: String,
        subtrahend: String,
    },
}

impl DerivedMetric {
    pub fn name(&self) -> &str {
        match self {
            DerivedMetric::ShareOfGroup { name, .. }
            | DerivedMetric::Ratio { name, .. }
            | DerivedMetric::Difference { name, .. } => name,
        }
    }

    /// Metric names this one reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            DerivedMetric::ShareOfGroup { source, .. } => vec![source.as_str()],
            DerivedMetric::Ratio { numerator, denominator, .. } => {
                vec![numerator.as_str(), denominator.as_str()]
            }
            DerivedMetric::Difference { minuend, subtrahend, .. } => {
                vec![minuend.as_str(), subtrahend.as_str()]
            }
        }
    }
}

// ============================================================================
// ROLLUP
// ============================================================================

/// Where synthetic rollup rows land in the sorted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalPlacement {
    /// Each rollup row directly follows the rows it summarizes.
    PerGroup,
    /// All rollup rows follow all named rows.
    Trailing,
}

impl Default for TotalPlacement {
    fn default() -> Self {
        TotalPlacement::PerGroup
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupSpec {
    /// The dimension whose values are summed into the rollup row.
    pub dimension: String,

    #[serde(default = "default_total_label")]
    pub label: String,

    #[serde(default)]
    pub placement: TotalPlacement,
}

fn default_total_label() -> String {
    "Total".to_string()
}

impl RollupSpec {
    pub fn new(dimension: impl Into<String>, placement: TotalPlacement) -> Self {
        RollupSpec {
            dimension: dimension.into(),
            label: default_total_label(),
            placement,
        }
    }
}

// ============================================================================
// PIVOT
// ============================================================================

/// Whether a pivoted metric is a raw figure or a percentage.
/// Drives column naming under `ColumnNaming::StatusMetric`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricRole {
    Value,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotValue {
    pub metric: String,
    #[serde(default = "default_role")]
    pub role: MetricRole,
}

fn default_role() -> MetricRole {
    MetricRole::Value
}

impl PivotValue {
    pub fn value(metric: impl Into<String>) -> Self {
        PivotValue { metric: metric.into(), role: MetricRole::Value }
    }

    pub fn percentage(metric: impl Into<String>) -> Self {
        PivotValue { metric: metric.into(), role: MetricRole::Percentage }
    }
}

/// How pivoted columns are named from (pivot value label, metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnNaming {
    /// The pivot value label itself (`2015-07-06`, `Canceled`).
    Label,
    /// `Not_canceled_value`, `Not_canceled_Percentage`.
    StatusMetric,
    /// A fixed prefix followed by the label (`% Cancellations City Hotel`).
    Prefixed(String),
}

impl Default for ColumnNaming {
    fn default() -> Self {
        ColumnNaming::Label
    }
}

impl ColumnNaming {
    pub fn column_name(&self, label: &str, role: MetricRole) -> String {
        match self {
            ColumnNaming::Label => label.to_string(),
            ColumnNaming::StatusMetric => {
                let stem = label.replace(' ', "_");
                match role {
                    MetricRole::Value => format!("{}_value", stem),
                    MetricRole::Percentage => format!("{}_Percentage", stem),
                }
            }
            ColumnNaming::Prefixed(prefix) => format!("{}{}", prefix, label),
        }
    }
}

/// Rate of one pivoted column over the row total, as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRate {
    pub name: String,
    /// Label of the pivot value used as numerator.
    pub numerator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotSpec {
    /// Dimension whose observed values become columns. Must be in `group_by`.
    pub dimension: String,

    /// Metrics to spread, each producing one column set (metric-major).
    pub values: Vec<PivotValue>,

    #[serde(default)]
    pub naming: ColumnNaming,

    /// Appends a column summing the first value's cells across pivot values.
    #[serde(default)]
    pub row_total: Option<String>,

    #[serde(default)]
    pub rate: Option<PivotRate>,
}

impl PivotSpec {
    pub fn new(dimension: impl Into<String>, values: Vec<PivotValue>) -> Self {
        PivotSpec {
            dimension: dimension.into(),
            values,
            naming: ColumnNaming::Label,
            row_total: None,
            rate: None,
        }
    }

    pub fn with_naming(mut self, naming: ColumnNaming) -> Self {
        self.naming = naming;
        self
    }
}

// ============================================================================
// ROW SELECTION & DERIVED FIELDS
// ============================================================================

/// Record filters, applied in declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowFilter {
    /// Keep records whose field label is in the list.
    In { field: String, values: Vec<String> },
    /// Keep records whose field is among the `count` most frequent labels.
    TopValues { field: String, count: usize },
    /// Drop records with an empty (or unparsable) field.
    NotNull { field: String },
}

/// Fields manufactured before filtering and grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DerivedField {
    /// `Status` from `is_canceled`: "Canceled" / "Not canceled".
    Status,
    /// `origin` from `country`, only when the dataset has no origin field.
    Origin,
    /// `lead_time_group` from `lead_time`.
    LeadTimeGroup,
    /// `week` (Monday start date) from a date field.
    Week { source: String },
    /// `month_name` from a date field, in calendar order.
    Month { source: String },
}

/// Shape of the report body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportShape {
    /// One row per observed group.
    Aggregate,
    /// One row per record: group dimensions plus one raw field.
    Listing { value_field: String },
}

impl Default for ReportShape {
    fn default() -> Self {
        ReportShape::Aggregate
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Melts metric columns into (statistic, value) rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeltSpec {
    pub variable: String,
    pub value: String,
}

/// A constant leading column, e.g. `group = All`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantColumn {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Column selection and order, by internal name. Missing columns are
    /// skipped. `None` keeps the pipeline's natural order.
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    /// Sort dimensions. `None` sorts by the key dimensions in group order.
    #[serde(default)]
    pub sort_by: Option<Vec<String>>,

    /// Rename headers to presentation labels.
    #[serde(default)]
    pub display_names: bool,

    /// Collapse key dimensions into one dash-joined column.
    #[serde(default)]
    pub label_column: Option<String>,

    #[serde(default)]
    pub melt: Option<MeltSpec>,

    #[serde(default)]
    pub constant_column: Option<ConstantColumn>,
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete, serializable definition of one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Report identifier; also the output file stem.
    pub name: String,

    #[serde(default)]
    pub derived_fields: Vec<DerivedField>,

    #[serde(default)]
    pub filters: Vec<RowFilter>,

    #[serde(default)]
    pub shape: ReportShape,

    /// Grouping dimensions, outer to inner. Includes the pivot dimension.
    #[serde(default)]
    pub group_by: Vec<String>,

    #[serde(default)]
    pub metrics: Vec<MetricSpec>,

    #[serde(default)]
    pub derived_metrics: Vec<DerivedMetric>,

    #[serde(default)]
    pub rollup: Option<RollupSpec>,

    #[serde(default)]
    pub pivot: Option<PivotSpec>,

    #[serde(default)]
    pub output: OutputSpec,
}

impl ReportSpec {
    pub fn new(name: impl Into<String>) -> Self {
        ReportSpec {
            name: name.into(),
            derived_fields: Vec::new(),
            filters: Vec::new(),
            shape: ReportShape::Aggregate,
            group_by: Vec::new(),
            metrics: Vec::new(),
            derived_metrics: Vec::new(),
            rollup: None,
            pivot: None,
            output: OutputSpec::default(),
        }
    }

    /// Adds a record filter after the existing ones.
    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a list of report definitions.
    pub fn catalog_from_json(json: &str) -> Result<Vec<ReportSpec>, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Names of all metric columns, base metrics first.
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics
            .iter()
            .map(|m| m.name.as_str())
            .chain(self.derived_metrics.iter().map(|d| d.name()))
            .collect()
    }
}

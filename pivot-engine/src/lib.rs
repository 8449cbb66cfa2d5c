//! FILENAME: pivot-engine/src/lib.rs
//! Report engine for the booking dataset.
//!
//! Every report is a `ReportSpec` run through one generic pipeline. The
//! crate depends on `dataset` for values, interning and the record table.
//!
//! Layers:
//! - `definition`: Serializable configuration (what a report IS)
//! - `aggregate`: Group aggregation and key ordering (HOW we compute)
//! - `binning`: Derived status, origin, bucket and period fields
//! - `totals`: Rollup rows recomputed from raw counts
//! - `pivot`: Long-to-wide reshaping
//! - `format`: Column selection, melt, display names, rounding
//! - `view`: Renderable output (WHAT we write)
//! - `engine`: The pipeline itself
//! - `presets`: Constructors and catalogs for the published reports

pub mod definition;
pub mod aggregate;
pub mod binning;
pub mod totals;
pub mod pivot;
pub mod format;
pub mod view;
pub mod engine;
pub mod presets;
pub mod error;

#[cfg(test)]
mod test_data;

pub use definition::*;
pub use aggregate::{aggregate, percentage, AggregateAccumulator, Aggregation, AggregationRow, GroupKey, KeyOrder};
pub use binning::{apply_derived_field, month_names, week_start, LeadTimeBucket};
pub use totals::inject_totals;
pub use pivot::{pivot, PivotColumn, WideRow, WideTable};
pub use format::{display_name, round_half_up, DISPLAY_NAMES};
pub use view::{ReportCell, ReportView};
pub use engine::{run_catalog, run_report, ReportCalculator};
pub use presets::{Period, TimelineMetric};
pub use error::EngineError;

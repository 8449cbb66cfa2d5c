//! FILENAME: pivot-engine/src/engine.rs
//! Report Engine - The generic pipeline that turns a dataset into a report.
//!
//! This module takes a ReportSpec (configuration) and a Dataset (data)
//! and produces a ReportView (header + rows ready for writing).
//!
//! Algorithm:
//! 1. Manufacture derived fields (status, origin, buckets, periods)
//! 2. Apply record filters in declared order
//! 3. Aggregate by the grouping dimensions (or list records)
//! 4. Attach derived metrics and inject rollup rows
//! 5. Evaluate, pivot when requested, sort by key
//! 6. Format: select, melt, rename, round
//!
//! The input dataset is never modified; every step returns a new view.

use dataset::Dataset;
use log::debug;
use rustc_hash::FxHashSet;
use crate::aggregate::{aggregate, Aggregation, KeyOrder};
use crate::binning::apply_derived_field;
use crate::definition::{PivotSpec, ReportShape, ReportSpec, RowFilter};
use crate::error::EngineError;
use crate::format::{format_listing, format_long, format_wide};
use crate::pivot::pivot;
use crate::totals::inject_totals;
use crate::view::ReportView;

// ============================================================================
// REPORT CALCULATOR
// ============================================================================

/// Runs one report. Holds per-call state only.
pub struct ReportCalculator<'a> {
    dataset: &'a Dataset,
    spec: &'a ReportSpec,
}

impl<'a> ReportCalculator<'a> {
    pub fn new(dataset: &'a Dataset, spec: &'a ReportSpec) -> Self {
        ReportCalculator { dataset, spec }
    }

    /// Executes the full pipeline and returns the rendered view.
    pub fn calculate(&self) -> Result<ReportView, EngineError> {
        self.validate()?;

        // Step 1: Derived fields
        let prepared = self.derive_fields()?;

        // Step 2: Filters
        let selected = self.apply_filters(prepared)?;
        debug!(
            "report '{}': {} of {} records selected",
            self.spec.name,
            selected.len(),
            self.dataset.len()
        );

        if let ReportShape::Listing { value_field } = &self.spec.shape {
            return self.listing(&selected, value_field);
        }

        // Step 3-4: Aggregate, derived metrics, rollup
        let aggregation = self.aggregate(&selected)?;

        // Step 5-6: Shape and format
        match &self.spec.pivot {
            Some(pivot_spec) => self.wide(aggregation, pivot_spec),
            None => self.long(aggregation),
        }
    }

    /// Structural checks that do not need data.
    fn validate(&self) -> Result<(), EngineError> {
        let mut names = FxHashSet::default();
        for name in self.spec.metric_names() {
            if !names.insert(name) {
                return Err(EngineError::InvalidDefinition(format!(
                    "metric '{}' defined twice",
                    name
                )));
            }
        }
        if let Some(pivot_spec) = &self.spec.pivot {
            if !self.spec.group_by.contains(&pivot_spec.dimension) {
                return Err(EngineError::InvalidDefinition(format!(
                    "pivot dimension '{}' is not grouped",
                    pivot_spec.dimension
                )));
            }
        }
        if matches!(self.spec.shape, ReportShape::Aggregate) && self.spec.metrics.is_empty() {
            return Err(EngineError::InvalidDefinition(format!(
                "report '{}' has no metrics",
                self.spec.name
            )));
        }
        Ok(())
    }

    fn derive_fields(&self) -> Result<Dataset, EngineError> {
        let mut current = self.dataset.clone();
        for derived in &self.spec.derived_fields {
            current = apply_derived_field(&current, derived)?;
        }
        Ok(current)
    }

    fn apply_filters(&self, dataset: Dataset) -> Result<Dataset, EngineError> {
        let mut current = dataset;
        for filter in &self.spec.filters {
            current = match filter {
                RowFilter::In { field, values } => current.filter_in(field, values)?,
                RowFilter::TopValues { field, count } => {
                    let top = current.top_values(field, *count)?;
                    debug!("top {} values of '{}': {:?}", count, field, top);
                    current.filter_in(field, &top)?
                }
                RowFilter::NotNull { field } => current.require(field)?,
            };
        }
        Ok(current)
    }

    fn listing(&self, dataset: &Dataset, value_field: &str) -> Result<ReportView, EngineError> {
        // Only the value must be present; empty dimensions list as "".
        let rows = dataset.require(value_field)?;
        debug!("report '{}': listing {} records", self.spec.name, rows.len());
        format_listing(&self.spec.name, &rows, &self.spec.group_by, value_field, &self.spec.output)
    }

    fn aggregate(&self, dataset: &Dataset) -> Result<Aggregation, EngineError> {
        let mut aggregation = aggregate(dataset, &self.spec.group_by, &self.spec.metrics)?
            .with_derived(&self.spec.derived_metrics)?;
        debug!(
            "report '{}': {} groups over {:?}",
            self.spec.name,
            aggregation.rows.len(),
            self.spec.group_by
        );

        if let Some(rollup) = &self.spec.rollup {
            if self.spec.group_by.contains(&rollup.dimension) {
                aggregation = inject_totals(aggregation, rollup)?;
            } else {
                debug!(
                    "report '{}': rollup dimension '{}' not grouped, no totals",
                    self.spec.name, rollup.dimension
                );
            }
        }

        aggregation.evaluate()?;
        Ok(aggregation)
    }

    fn long(&self, mut aggregation: Aggregation) -> Result<ReportView, EngineError> {
        let order = KeyOrder::new(
            &aggregation.dimensions,
            &aggregation.caches,
            self.spec.output.sort_by.as_deref(),
            self.spec.rollup.as_ref(),
        )?;
        aggregation.sort(&order);
        Ok(format_long(&self.spec.name, &aggregation, &self.spec.output))
    }

    fn wide(&self, aggregation: Aggregation, pivot_spec: &PivotSpec) -> Result<ReportView, EngineError> {
        let mut table = pivot(&aggregation, pivot_spec)?;
        let order = KeyOrder::new(
            &table.key_dimensions,
            &table.caches,
            self.spec.output.sort_by.as_deref(),
            self.spec.rollup.as_ref(),
        )?;
        table.sort(&order);
        Ok(format_wide(&self.spec.name, &table, &self.spec.output))
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Calculates one report from a dataset.
/// This is the main entry point of the engine.
pub fn run_report(dataset: &Dataset, spec: &ReportSpec) -> Result<ReportView, EngineError> {
    ReportCalculator::new(dataset, spec).calculate()
}

/// Calculates every report of a catalog, stopping at the first failure.
pub fn run_catalog(dataset: &Dataset, specs: &[ReportSpec]) -> Result<Vec<ReportView>, EngineError> {
    specs.iter().map(|spec| run_report(dataset, spec)).collect()
}

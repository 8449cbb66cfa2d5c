//! FILENAME: pivot-engine/src/pivot.rs
//! Pivot reshaping - long rows (key x pivot value) into wide rows (key).
//!
//! The column set is data dependent: one column per observed pivot value per
//! pivoted metric. Columns are built from the observed values in one pass,
//! then sorted by the pivot field's own ordering (chronological for dates,
//! enumeration order for buckets and status).

use std::sync::Arc;
use dataset::{FieldCache, ValueId};
use rustc_hash::{FxHashMap, FxHashSet};
use log::debug;
use crate::aggregate::{percentage, Aggregation, GroupKey, KeyOrder};
use crate::definition::{MetricFormat, PivotSpec};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct PivotColumn {
    pub name: String,
    pub format: MetricFormat,
}

#[derive(Debug, Clone)]
pub struct WideRow {
    pub key: GroupKey,
    /// One per column, in `WideTable::columns` order.
    pub cells: Vec<f64>,
}

/// Wide-format result: one row per key, one column per (metric, pivot value).
#[derive(Debug, Clone)]
pub struct WideTable {
    pub key_dimensions: Vec<String>,
    pub caches: Vec<Arc<FieldCache>>,
    pub columns: Vec<PivotColumn>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn key_label(&self, row: &WideRow, position: usize) -> String {
        self.caches
            .get(position)
            .map(|c| c.label(row.key.get(position)))
            .unwrap_or_default()
    }

    pub fn sort(&mut self, order: &KeyOrder) {
        self.rows.sort_by(|a, b| order.compare(&a.key, &b.key));
    }
}

/// Spreads the pivot dimension of an evaluated aggregation into columns.
/// Missing (key, pivot value) cells are 0.
pub fn pivot(aggregation: &Aggregation, spec: &PivotSpec) -> Result<WideTable, EngineError> {
    if spec.values.is_empty() {
        return Err(EngineError::InvalidDefinition(format!(
            "pivot on '{}' has no values",
            spec.dimension
        )));
    }

    let position = aggregation.dimension_index(&spec.dimension)?;
    let metric_indices = spec
        .values
        .iter()
        .map(|v| aggregation.metric_index(&v.metric))
        .collect::<Result<Vec<_>, _>>()?;
    let formats = aggregation.metric_columns();
    let pivot_cache = &aggregation.caches[position];

    // Observed pivot values, in the pivot field's order
    let mut seen: FxHashSet<ValueId> = FxHashSet::default();
    let mut observed: Vec<ValueId> = Vec::new();
    for row in &aggregation.rows {
        let id = row.key.get(position);
        if seen.insert(id) {
            observed.push(id);
        }
    }
    observed.sort_by(|&a, &b| pivot_cache.compare_ids(a, b));
    let slot_of: FxHashMap<ValueId, usize> = observed.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let width = observed.len();

    let mut columns: Vec<PivotColumn> = Vec::with_capacity(width * spec.values.len() + 2);
    for (value, &metric) in spec.values.iter().zip(&metric_indices) {
        for &id in &observed {
            columns.push(PivotColumn {
                name: spec.naming.column_name(&pivot_cache.label(id), value.role),
                format: formats[metric].1,
            });
        }
    }

    let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
    let mut rows: Vec<WideRow> = Vec::new();
    for row in &aggregation.rows {
        let key = row.key.without(position);
        let wide = match index.get(&key) {
            Some(&i) => i,
            None => {
                index.insert(key.clone(), rows.len());
                rows.push(WideRow {
                    key,
                    cells: vec![0.0; columns.len()],
                });
                rows.len() - 1
            }
        };
        let slot = slot_of[&row.key.get(position)];
        for (v, &metric) in metric_indices.iter().enumerate() {
            rows[wide].cells[v * width + slot] = row.values.get(metric).copied().unwrap_or(0.0);
        }
    }

    // Row total and rate read the first pivoted metric.
    if let Some(name) = &spec.row_total {
        for row in rows.iter_mut() {
            let total: f64 = row.cells[..width].iter().sum();
            row.cells.push(total);
        }
        columns.push(PivotColumn {
            name: name.clone(),
            format: formats[metric_indices[0]].1,
        });
    }

    if let Some(rate) = &spec.rate {
        let numerator = observed
            .iter()
            .position(|&id| pivot_cache.label(id) == rate.numerator);
        for row in rows.iter_mut() {
            let total: f64 = row.cells[..width].iter().sum();
            let part = numerator.map(|s| row.cells[s]).unwrap_or(0.0);
            row.cells.push(percentage(part, total));
        }
        columns.push(PivotColumn {
            name: rate.name.clone(),
            format: MetricFormat::Decimal,
        });
    }

    let mut key_dimensions = aggregation.dimensions.clone();
    key_dimensions.remove(position);
    let mut caches = aggregation.caches.clone();
    caches.remove(position);

    debug!(
        "pivot on '{}': {} rows x {} columns",
        spec.dimension,
        rows.len(),
        columns.len()
    );

    Ok(WideTable {
        key_dimensions,
        caches,
        columns,
        rows,
    })
}

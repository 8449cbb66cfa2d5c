//! FILENAME: pivot-engine/src/aggregate.rs
//! Group aggregation - one pass over the records, one row per observed key.
//!
//! Accumulators keep raw sums and counts (never percentages), so rows can be
//! merged later into rollups and every ratio recomputed exactly.

use std::cmp::Ordering;
use std::sync::Arc;
use dataset::{Dataset, FieldCache, FieldIndex, ValueId, VALUE_ID_EMPTY};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use crate::definition::{
    AggregationType, DerivedMetric, MetricFormat, MetricSpec, RollupSpec, TotalPlacement,
};
use crate::error::EngineError;

// ============================================================================
// GROUP KEY
// ============================================================================

/// Ordered tuple of interned dimension values. Empty tuple = whole dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub values: SmallVec<[ValueId; 4]>,
}

impl GroupKey {
    pub fn new(values: SmallVec<[ValueId; 4]>) -> Self {
        GroupKey { values }
    }

    pub fn empty() -> Self {
        GroupKey { values: SmallVec::new() }
    }

    /// The key with the value at `position` removed.
    pub fn without(&self, position: usize) -> GroupKey {
        let values = self
            .values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, &id)| id)
            .collect();
        GroupKey { values }
    }

    /// The key with the value at `position` replaced.
    pub fn replaced(&self, position: usize, id: ValueId) -> GroupKey {
        let mut values = self.values.clone();
        if let Some(slot) = values.get_mut(position) {
            *slot = id;
        }
        GroupKey { values }
    }

    pub fn get(&self, position: usize) -> ValueId {
        self.values.get(position).copied().unwrap_or(VALUE_ID_EMPTY)
    }
}

// ============================================================================
// AGGREGATE ACCUMULATOR
// ============================================================================

/// Mean and sum of squared deviations of a sample, combinable pairwise so
/// rollup rows get the same spread as a single pass over their records.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Spread {
    mean: f64,
    m2: f64,
}

impl Spread {
    /// Folds a sample of `theirs` numbers into one of `ours` numbers.
    fn absorb(&mut self, ours: u64, other: Spread, theirs: u64) {
        if theirs == 0 {
            return;
        }
        let (ours, theirs) = (ours as f64, theirs as f64);
        let total = ours + theirs;
        let shift = other.mean - self.mean;
        self.mean += shift * theirs / total;
        self.m2 += other.m2 + shift * shift * ours * theirs / total;
    }

    fn sample_std(&self, n: u64) -> f64 {
        if n < 2 {
            return 0.0;
        }
        (self.m2 / (n - 1) as f64).sqrt()
    }
}

/// Running state for one metric of one group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateAccumulator {
    pub sum: f64,
    /// Records seen, numeric or not.
    pub count: u64,
    /// Records that carried a number.
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    spread: Spread,
    /// Raw numbers, only kept when a median is requested.
    values: Option<Vec<f64>>,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An accumulator that also keeps every number (for medians).
    pub fn retaining() -> Self {
        AggregateAccumulator {
            values: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Records one booking whose metric field holds `value`.
    pub fn add_number(&mut self, value: f64) {
        self.spread.absorb(self.count_numbers, Spread { mean: value, m2: 0.0 }, 1);
        self.count += 1;
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        if let Some(values) = self.values.as_mut() {
            values.push(value);
        }
    }

    /// Records one booking whose metric field is empty or unparsable. It
    /// still counts as a row for `Count` without a field.
    pub fn add_non_number(&mut self) {
        self.count += 1;
    }

    /// Final value of one statistic. Undefined statistics are 0.
    pub fn compute(&self, aggregation: AggregationType) -> f64 {
        match aggregation {
            AggregationType::Count => self.count as f64,
            AggregationType::Sum => self.sum,
            AggregationType::Mean => {
                if self.count_numbers > 0 {
                    self.sum / (self.count_numbers as f64)
                } else {
                    0.0
                }
            }
            AggregationType::Median => self.median(),
            AggregationType::StdDev => self.spread.sample_std(self.count_numbers),
            AggregationType::Min => self.min.unwrap_or(0.0),
            AggregationType::Max => self.max.unwrap_or(0.0),
        }
    }

    fn median(&self) -> f64 {
        let Some(values) = self.values.as_ref().filter(|v| !v.is_empty()) else {
            return 0.0;
        };
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Adds the bookings of another group, as when building a Total row.
    pub fn merge(&mut self, other: &AggregateAccumulator) {
        self.spread.absorb(self.count_numbers, other.spread, other.count_numbers);
        self.sum += other.sum;
        self.count += other.count;
        self.count_numbers += other.count_numbers;

        if let Some(theirs) = other.min {
            self.min = Some(self.min.map_or(theirs, |m| m.min(theirs)));
        }
        if let Some(theirs) = other.max {
            self.max = Some(self.max.map_or(theirs, |m| m.max(theirs)));
        }
        if let Some(theirs) = other.values.as_ref() {
            self.values.get_or_insert_with(Vec::new).extend_from_slice(theirs);
        }
    }
}

/// `numerator / denominator * 100`, 0 when the denominator is 0.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

fn evaluate_metric(metric: &MetricSpec, acc: &AggregateAccumulator) -> f64 {
    match metric.aggregation {
        AggregationType::Count if metric.field.is_some() => acc.count_numbers as f64,
        aggregation => acc.compute(aggregation),
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct AggregationRow {
    pub key: GroupKey,
    /// One per base metric.
    pub accumulators: Vec<AggregateAccumulator>,
    /// Base then derived metric values; filled by `Aggregation::evaluate`.
    pub values: Vec<f64>,
}

/// Long-format result: one row per observed group key.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub dimensions: Vec<String>,
    pub caches: Vec<Arc<FieldCache>>,
    pub metrics: Vec<MetricSpec>,
    pub derived: Vec<DerivedMetric>,
    pub rows: Vec<AggregationRow>,
}

/// Groups `dataset` by `group_by` and accumulates `metrics` per group.
///
/// Only observed combinations appear. Records with an empty value in any
/// grouping dimension are left out. No records means no rows.
pub fn aggregate(
    dataset: &Dataset,
    group_by: &[String],
    metrics: &[MetricSpec],
) -> Result<Aggregation, EngineError> {
    let mut dim_indices: Vec<FieldIndex> = Vec::with_capacity(group_by.len());
    let mut caches = Vec::with_capacity(group_by.len());
    for dim in group_by {
        let idx = dataset
            .field_index(dim)
            .map_err(|_| EngineError::UnknownDimension(dim.clone()))?;
        dim_indices.push(idx);
        caches.push(dataset.cache(dim)?.clone());
    }

    let mut metric_fields: Vec<Option<FieldIndex>> = Vec::with_capacity(metrics.len());
    for metric in metrics {
        match (&metric.field, metric.aggregation) {
            (Some(field), _) => metric_fields.push(Some(dataset.field_index(field)?)),
            (None, AggregationType::Count) => metric_fields.push(None),
            (None, _) => return Err(EngineError::MissingMetricField(metric.name.clone())),
        }
    }

    let new_accumulators = || -> Vec<AggregateAccumulator> {
        metrics
            .iter()
            .map(|m| match m.aggregation {
                AggregationType::Median => AggregateAccumulator::retaining(),
                _ => AggregateAccumulator::new(),
            })
            .collect()
    };

    let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
    let mut rows: Vec<AggregationRow> = Vec::new();

    for record in dataset.records() {
        let values: SmallVec<[ValueId; 4]> = dim_indices.iter().map(|&i| record.value_id(i)).collect();
        if values.contains(&VALUE_ID_EMPTY) {
            continue;
        }
        let key = GroupKey::new(values);

        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = rows.len();
                rows.push(AggregationRow {
                    key: key.clone(),
                    accumulators: new_accumulators(),
                    values: Vec::new(),
                });
                index.insert(key, slot);
                slot
            }
        };

        let row = &mut rows[slot];
        for (acc, field) in row.accumulators.iter_mut().zip(&metric_fields) {
            match field.and_then(|idx| record.value_at(idx).as_f64()) {
                Some(n) => acc.add_number(n),
                None => acc.add_non_number(),
            }
        }
    }

    Ok(Aggregation {
        dimensions: group_by.to_vec(),
        caches,
        metrics: metrics.to_vec(),
        derived: Vec::new(),
        rows,
    })
}

impl Aggregation {
    /// Attaches derived metrics after checking every input exists.
    pub fn with_derived(mut self, derived: &[DerivedMetric]) -> Result<Self, EngineError> {
        let mut known: Vec<&str> = self.metrics.iter().map(|m| m.name.as_str()).collect();
        for metric in derived {
            for input in metric.inputs() {
                if !known.contains(&input) {
                    return Err(EngineError::UnknownMetric(input.to_string()));
                }
            }
            if let DerivedMetric::ShareOfGroup { within, .. } = metric {
                for dim in within {
                    self.dimension_index(dim)?;
                }
            }
            known.push(metric.name());
        }
        self.derived = derived.to_vec();
        Ok(self)
    }

    pub fn dimension_index(&self, name: &str) -> Result<usize, EngineError> {
        self.dimensions
            .iter()
            .position(|d| d == name)
            .ok_or_else(|| EngineError::UnknownDimension(name.to_string()))
    }

    /// Metric column names and formats, base metrics first.
    pub fn metric_columns(&self) -> Vec<(String, MetricFormat)> {
        let mut columns: Vec<(String, MetricFormat)> = self
            .metrics
            .iter()
            .map(|m| (m.name.clone(), m.format))
            .collect();
        for metric in &self.derived {
            let format = match metric {
                DerivedMetric::Difference { minuend, .. } => columns
                    .iter()
                    .find(|(name, _)| name == minuend)
                    .map(|(_, f)| *f)
                    .unwrap_or_default(),
                _ => MetricFormat::Decimal,
            };
            columns.push((metric.name().to_string(), format));
        }
        columns
    }

    pub fn metric_index(&self, name: &str) -> Result<usize, EngineError> {
        self.metrics
            .iter()
            .map(|m| m.name.as_str())
            .chain(self.derived.iter().map(|d| d.name()))
            .position(|n| n == name)
            .ok_or_else(|| EngineError::UnknownMetric(name.to_string()))
    }

    /// True when any dimension of the key holds a rollup label.
    pub fn is_rollup_key(&self, key: &GroupKey) -> bool {
        key.values
            .iter()
            .zip(&self.caches)
            .any(|(&id, cache)| cache.is_trailing(id))
    }

    /// Computes base and derived metric values for every row.
    pub fn evaluate(&mut self) -> Result<(), EngineError> {
        for row in self.rows.iter_mut() {
            row.values = self
                .metrics
                .iter()
                .zip(&row.accumulators)
                .map(|(m, acc)| evaluate_metric(m, acc))
                .collect();
        }

        for metric in self.derived.clone() {
            let column = self.evaluate_derived(&metric)?;
            for (row, value) in self.rows.iter_mut().zip(column) {
                row.values.push(value);
            }
        }
        Ok(())
    }

    fn evaluate_derived(&self, metric: &DerivedMetric) -> Result<Vec<f64>, EngineError> {
        let column = match metric {
            DerivedMetric::Ratio { numerator, denominator, .. } => {
                let n = self.metric_index(numerator)?;
                let d = self.metric_index(denominator)?;
                self.rows
                    .iter()
                    .map(|r| percentage(r.values[n], r.values[d]))
                    .collect()
            }
            DerivedMetric::Difference { minuend, subtrahend, .. } => {
                let a = self.metric_index(minuend)?;
                let b = self.metric_index(subtrahend)?;
                self.rows.iter().map(|r| r.values[a] - r.values[b]).collect()
            }
            DerivedMetric::ShareOfGroup { source, within, .. } => {
                let s = self.metric_index(source)?;
                let positions = within
                    .iter()
                    .map(|d| self.dimension_index(d))
                    .collect::<Result<Vec<_>, _>>()?;

                // Rollup rows only share a denominator with other rollup rows.
                let share_key = |row: &AggregationRow| -> (GroupKey, bool) {
                    let values = positions.iter().map(|&p| row.key.get(p)).collect();
                    let rollup = row
                        .key
                        .values
                        .iter()
                        .enumerate()
                        .any(|(i, &id)| !positions.contains(&i) && self.caches[i].is_trailing(id));
                    (GroupKey::new(values), rollup)
                };

                let mut totals: FxHashMap<(GroupKey, bool), f64> = FxHashMap::default();
                for row in &self.rows {
                    *totals.entry(share_key(row)).or_insert(0.0) += row.values[s];
                }
                self.rows
                    .iter()
                    .map(|r| {
                        let total = totals.get(&share_key(r)).copied().unwrap_or(0.0);
                        percentage(r.values[s], total)
                    })
                    .collect()
            }
        };
        Ok(column)
    }

    pub fn sort(&mut self, order: &KeyOrder) {
        self.rows.sort_by(|a, b| order.compare(&a.key, &b.key));
    }

    /// Label of dimension `position` of a row's key.
    pub fn key_label(&self, row: &AggregationRow, position: usize) -> String {
        self.caches
            .get(position)
            .map(|c| c.label(row.key.get(position)))
            .unwrap_or_default()
    }
}

// ============================================================================
// KEY ORDERING
// ============================================================================

/// Sort order over group keys: the listed dimensions first, then the
/// remaining ones, each by its field ordering. With trailing placement the
/// rollup rows go after every named row.
#[derive(Debug, Clone)]
pub struct KeyOrder {
    caches: Vec<Arc<FieldCache>>,
    positions: Vec<usize>,
    rollup_last: Option<usize>,
}

impl KeyOrder {
    pub fn new(
        dimensions: &[String],
        caches: &[Arc<FieldCache>],
        sort_by: Option<&[String]>,
        rollup: Option<&RollupSpec>,
    ) -> Result<Self, EngineError> {
        let mut positions = Vec::with_capacity(dimensions.len());
        for name in sort_by.unwrap_or(&[]) {
            let pos = dimensions
                .iter()
                .position(|d| d == name)
                .ok_or_else(|| EngineError::UnknownDimension(name.clone()))?;
            if !positions.contains(&pos) {
                positions.push(pos);
            }
        }
        for pos in 0..dimensions.len() {
            if !positions.contains(&pos) {
                positions.push(pos);
            }
        }

        let rollup_last = rollup
            .filter(|r| r.placement == TotalPlacement::Trailing)
            .and_then(|r| dimensions.iter().position(|d| *d == r.dimension));

        Ok(KeyOrder {
            caches: caches.to_vec(),
            positions,
            rollup_last,
        })
    }

    pub fn compare(&self, a: &GroupKey, b: &GroupKey) -> Ordering {
        if let Some(p) = self.rollup_last {
            let cache = &self.caches[p];
            let ord = cache.is_trailing(a.get(p)).cmp(&cache.is_trailing(b.get(p)));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        for &p in &self.positions {
            let ord = self.caches[p].compare_ids(a.get(p), b.get(p));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

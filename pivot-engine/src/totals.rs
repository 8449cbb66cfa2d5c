//! FILENAME: pivot-engine/src/totals.rs
//! Rollup rows - synthetic "Total" rows over one dimension.
//!
//! A Total row merges the raw accumulators of every row that shares the
//! other dimensions. Rates are then evaluated from the merged counts like any
//! other row, never averaged from per-category rates.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use log::debug;
use crate::aggregate::{Aggregation, AggregationRow, GroupKey};
use crate::definition::RollupSpec;
use crate::error::EngineError;

/// Appends one rollup row per distinct combination of the other dimensions.
/// With no other dimensions, exactly one rollup row is added (if any rows
/// exist). The rollup label ranks after every observed value of the
/// dimension.
pub fn inject_totals(mut aggregation: Aggregation, rollup: &RollupSpec) -> Result<Aggregation, EngineError> {
    let position = aggregation.dimension_index(&rollup.dimension)?;
    let (cache, total_id) = aggregation.caches[position].with_trailing(&rollup.label);
    aggregation.caches[position] = Arc::new(cache);

    let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();
    let mut totals: Vec<AggregationRow> = Vec::new();

    for row in &aggregation.rows {
        let key = row.key.replaced(position, total_id);
        match index.get(&key) {
            Some(&slot) => {
                for (acc, other) in totals[slot].accumulators.iter_mut().zip(&row.accumulators) {
                    acc.merge(other);
                }
            }
            None => {
                index.insert(key.clone(), totals.len());
                totals.push(AggregationRow {
                    key,
                    accumulators: row.accumulators.clone(),
                    values: Vec::new(),
                });
            }
        }
    }

    debug!(
        "rollup over '{}': {} total rows for {} rows",
        rollup.dimension,
        totals.len(),
        aggregation.rows.len()
    );
    aggregation.rows.extend(totals);
    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, KeyOrder};
    use crate::definition::{AggregationType, DerivedMetric, MetricSpec, TotalPlacement};
    use crate::test_data;

    fn rate_by(ds: &dataset::Dataset, group_by: &[&str]) -> Aggregation {
        let group_by: Vec<String> = group_by.iter().map(|s| s.to_string()).collect();
        let metrics = vec![
            MetricSpec::row_count("total"),
            MetricSpec::new("canceled", "is_canceled", AggregationType::Sum),
        ];
        let derived = vec![DerivedMetric::Ratio {
            name: "cancel_rate".into(),
            numerator: "canceled".into(),
            denominator: "total".into(),
        }];
        aggregate(ds, &group_by, &metrics).unwrap().with_derived(&derived).unwrap()
    }

    fn rows_as_labels(agg: &Aggregation) -> Vec<(Vec<String>, Vec<f64>)> {
        agg.rows
            .iter()
            .map(|r| {
                let key = (0..agg.dimensions.len()).map(|p| agg.key_label(r, p)).collect();
                (key, r.values.clone())
            })
            .collect()
    }

    #[test]
    fn test_total_rate_recomputed_from_counts() {
        let ds = test_data::scenario();
        let rollup = RollupSpec::new("origin", TotalPlacement::PerGroup);
        let mut agg = inject_totals(rate_by(&ds, &["hotel", "origin"]), &rollup).unwrap();
        agg.evaluate().unwrap();

        let rows = rows_as_labels(&agg);
        let total_a = rows
            .iter()
            .find(|(k, _)| k == &vec!["A".to_string(), "Total".to_string()])
            .unwrap();
        assert_eq!(total_a.1[0], 3.0);
        assert_eq!(total_a.1[1], 2.0);
        assert!((total_a.1[2] - 200.0 / 3.0).abs() < 1e-9);

        // (A,X) is 50% and (A,Y) is 100%; averaging would give 75%
        assert!((total_a.1[2] - 75.0).abs() > 1.0);

        let total_b = rows
            .iter()
            .find(|(k, _)| k == &vec!["B".to_string(), "Total".to_string()])
            .unwrap();
        assert_eq!(total_b.1, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_single_total_without_other_dimensions() {
        let ds = test_data::scenario();
        let rollup = RollupSpec::new("origin", TotalPlacement::Trailing);
        let mut agg = inject_totals(rate_by(&ds, &["origin"]), &rollup).unwrap();
        agg.evaluate().unwrap();
        let totals: Vec<_> = agg.rows.iter().filter(|r| agg.is_rollup_key(&r.key)).collect();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].values[0], 4.0);
        assert_eq!(totals[0].values[2], 50.0);
    }

    #[test]
    fn test_counts_equal_sum_over_rollup_values() {
        let ds = test_data::bookings();
        let rollup = RollupSpec::new("origin", TotalPlacement::PerGroup);
        let mut agg = inject_totals(rate_by(&ds, &["hotel", "origin"]), &rollup).unwrap();
        agg.evaluate().unwrap();

        for hotel in ["City Hotel", "Resort Hotel"] {
            let rows = rows_as_labels(&agg);
            let named: f64 = rows
                .iter()
                .filter(|(k, _)| k[0] == hotel && k[1] != "Total")
                .map(|(_, v)| v[0])
                .sum();
            let total = rows
                .iter()
                .find(|(k, _)| k[0] == hotel && k[1] == "Total")
                .map(|(_, v)| v[0])
                .unwrap();
            assert_eq!(named, total);
        }
    }

    #[test]
    fn test_placement() {
        let ds = test_data::scenario();

        let per_group = RollupSpec::new("origin", TotalPlacement::PerGroup);
        let mut agg = inject_totals(rate_by(&ds, &["hotel", "origin"]), &per_group).unwrap();
        let order = KeyOrder::new(&agg.dimensions, &agg.caches, None, Some(&per_group)).unwrap();
        agg.sort(&order);
        let keys: Vec<Vec<String>> = rows_as_labels(&agg).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                vec!["A", "X"],
                vec!["A", "Y"],
                vec!["A", "Total"],
                vec!["B", "X"],
                vec!["B", "Total"],
            ]
        );

        let trailing = RollupSpec::new("origin", TotalPlacement::Trailing);
        let mut agg = inject_totals(rate_by(&ds, &["hotel", "origin"]), &trailing).unwrap();
        let order = KeyOrder::new(&agg.dimensions, &agg.caches, None, Some(&trailing)).unwrap();
        agg.sort(&order);
        let keys: Vec<Vec<String>> = rows_as_labels(&agg).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                vec!["A", "X"],
                vec!["A", "Y"],
                vec!["B", "X"],
                vec!["A", "Total"],
                vec!["B", "Total"],
            ]
        );
    }

    #[test]
    fn test_unknown_rollup_dimension() {
        let ds = test_data::scenario();
        let rollup = RollupSpec::new("country", TotalPlacement::PerGroup);
        assert!(matches!(
            inject_totals(rate_by(&ds, &["hotel"]), &rollup),
            Err(EngineError::UnknownDimension(_))
        ));
    }

    #[test]
    fn test_no_rows_no_totals() {
        let ds = test_data::scenario().filter(|_| false);
        let rollup = RollupSpec::new("origin", TotalPlacement::Trailing);
        let agg = inject_totals(rate_by(&ds, &["origin"]), &rollup).unwrap();
        assert!(agg.rows.is_empty());
    }
}

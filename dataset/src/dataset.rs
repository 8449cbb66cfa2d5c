//! FILENAME: dataset/src/dataset.rs
//! Immutable columnar booking table.
//!
//! A `Dataset` is a set of shared physical columns plus a row selection.
//! Filtering produces a new selection over the same columns; deriving a field
//! produces a new column list with one extra column. Nothing here mutates a
//! dataset that has already been built.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::cache::{Column, FieldCache, FieldOrdering, ValueId, VALUE_ID_EMPTY};
use crate::error::DatasetError;
use crate::schema::{FieldIndex, FieldKind, Schema};
use crate::value::Value;

// ============================================================================
// DATASET
// ============================================================================

#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Arc<Column>>,
    field_index: FxHashMap<String, FieldIndex>,
    /// Selected physical rows, in source order.
    rows: Arc<[u32]>,
}

impl Dataset {
    fn from_parts(columns: Vec<Arc<Column>>, rows: Arc<[u32]>) -> Self {
        let field_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_string(), i))
            .collect();
        Dataset { columns, field_index, rows }
    }

    /// Number of selected records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index.contains_key(name)
    }

    pub fn field_index(&self, name: &str) -> Result<FieldIndex, DatasetError> {
        self.field_index
            .get(name)
            .copied()
            .ok_or_else(|| DatasetError::UnknownField(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column, DatasetError> {
        let idx = self.field_index(name)?;
        Ok(&self.columns[idx])
    }

    pub fn cache(&self, name: &str) -> Result<&Arc<FieldCache>, DatasetError> {
        Ok(&self.column(name)?.cache)
    }

    /// Value of `field` in the `row`-th selected record.
    pub fn value(&self, row: usize, field: &str) -> Result<&Value, DatasetError> {
        let column = self.column(field)?;
        Ok(self
            .rows
            .get(row)
            .map(|&physical| column.value_at(physical as usize))
            .unwrap_or(&Value::Empty))
    }

    pub fn records(&self) -> impl Iterator<Item = RecordRef<'_>> + '_ {
        self.rows.iter().map(move |&physical| RecordRef {
            dataset: self,
            row: physical as usize,
        })
    }

    /// Keeps the records matching `predicate`. Columns are shared, not copied.
    pub fn filter<F>(&self, predicate: F) -> Dataset
    where
        F: Fn(&RecordRef<'_>) -> bool,
    {
        let rows: Vec<u32> = self
            .records()
            .filter(|r| predicate(r))
            .map(|r| r.row as u32)
            .collect();
        Dataset {
            columns: self.columns.clone(),
            field_index: self.field_index.clone(),
            rows: rows.into(),
        }
    }

    /// Drops records whose `field` is empty.
    pub fn require(&self, field: &str) -> Result<Dataset, DatasetError> {
        let idx = self.field_index(field)?;
        Ok(self.filter(|r| r.value_id(idx) != VALUE_ID_EMPTY))
    }

    /// Keeps records whose `field` label is one of `labels`.
    pub fn filter_in<S: AsRef<str>>(&self, field: &str, labels: &[S]) -> Result<Dataset, DatasetError> {
        let idx = self.field_index(field)?;
        let cache = &self.columns[idx].cache;
        let wanted: Vec<ValueId> = labels
            .iter()
            .filter_map(|l| cache.lookup_label(l.as_ref()))
            .collect();
        Ok(self.filter(|r| wanted.contains(&r.value_id(idx))))
    }

    /// The `n` most frequent non-empty labels of `field`, by descending count,
    /// ties broken by label.
    pub fn top_values(&self, field: &str, n: usize) -> Result<Vec<String>, DatasetError> {
        let idx = self.field_index(field)?;
        let column = &self.columns[idx];

        let mut counts: FxHashMap<ValueId, usize> = FxHashMap::default();
        for &physical in self.rows.iter() {
            let id = column.id_at(physical as usize);
            if id != VALUE_ID_EMPTY {
                *counts.entry(id).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(id, count)| (column.cache.label(id), count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        Ok(ranked.into_iter().map(|(label, _)| label).collect())
    }

    /// Adds (or replaces) a derived column computed from each selected record.
    /// Rows outside the selection hold empty.
    pub fn with_virtual_field<F>(
        &self,
        name: &str,
        kind: FieldKind,
        ordering: FieldOrdering,
        derive: F,
    ) -> Dataset
    where
        F: Fn(&RecordRef<'_>) -> Value,
    {
        let mut cache = FieldCache::new(name, kind);
        cache.ordering = ordering;
        let mut ids = vec![VALUE_ID_EMPTY; self.physical_len()];
        for record in self.records() {
            ids[record.row] = cache.intern(derive(&record));
        }
        self.with_column(Column { cache: Arc::new(cache), ids })
    }

    /// Adds (or replaces) a bucket column. `labels` are interned up front in
    /// enumeration order; `derive` returns the bucket index, `None` for empty.
    pub fn with_enumerated_field<S, F>(&self, name: &str, labels: &[S], derive: F) -> Dataset
    where
        S: AsRef<str>,
        F: Fn(&RecordRef<'_>) -> Option<usize>,
    {
        let cache = FieldCache::enumerated(name, labels);
        let bucket_count = labels.len();
        let mut ids = vec![VALUE_ID_EMPTY; self.physical_len()];
        for record in self.records() {
            if let Some(bucket) = derive(&record).filter(|&b| b < bucket_count) {
                ids[record.row] = bucket as ValueId;
            }
        }
        self.with_column(Column { cache: Arc::new(cache), ids })
    }

    fn with_column(&self, column: Column) -> Dataset {
        let mut columns = self.columns.clone();
        match self.field_index.get(column.name()) {
            Some(&idx) => columns[idx] = Arc::new(column),
            None => columns.push(Arc::new(column)),
        }
        Dataset::from_parts(columns, self.rows.clone())
    }

    fn physical_len(&self) -> usize {
        self.columns.first().map(|c| c.ids.len()).unwrap_or(0)
    }
}

// ============================================================================
// RECORD VIEW
// ============================================================================

/// Borrowed view of one record.
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a> {
    dataset: &'a Dataset,
    row: usize,
}

impl<'a> RecordRef<'a> {
    /// Value of a field by name. Unknown fields read as empty.
    pub fn get(&self, name: &str) -> &'a Value {
        match self.dataset.field_index.get(name) {
            Some(&idx) => self.value_at(idx),
            None => &Value::Empty,
        }
    }

    pub fn value_at(&self, index: FieldIndex) -> &'a Value {
        match self.dataset.columns.get(index) {
            Some(column) => column.value_at(self.row),
            None => &Value::Empty,
        }
    }

    pub fn value_id(&self, index: FieldIndex) -> ValueId {
        self.dataset
            .columns
            .get(index)
            .map(|c| c.id_at(self.row))
            .unwrap_or(VALUE_ID_EMPTY)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Accumulates rows and interns values column by column.
#[derive(Debug)]
pub struct DatasetBuilder {
    caches: Vec<FieldCache>,
    ids: Vec<Vec<ValueId>>,
    failures: Vec<usize>,
    row_count: usize,
}

impl DatasetBuilder {
    /// Columns follow the schema's field order.
    pub fn new(schema: &Schema) -> Self {
        let caches = schema
            .fields()
            .iter()
            .map(|f| FieldCache::new(f.name.clone(), f.kind))
            .collect();
        Self::from_caches(caches)
    }

    /// Columns follow `headers`; kinds come from `schema`.
    pub fn with_headers<S: AsRef<str>>(headers: &[S], schema: &Schema) -> Result<Self, DatasetError> {
        let mut caches: Vec<FieldCache> = Vec::with_capacity(headers.len());
        for header in headers {
            let name = header.as_ref().trim();
            if caches.iter().any(|c| c.name == name) {
                return Err(DatasetError::DuplicateField(name.to_string()));
            }
            caches.push(FieldCache::new(name, schema.kind_of(name)));
        }
        Ok(Self::from_caches(caches))
    }

    fn from_caches(caches: Vec<FieldCache>) -> Self {
        let width = caches.len();
        DatasetBuilder {
            caches,
            ids: vec![Vec::new(); width],
            failures: vec![0; width],
            row_count: 0,
        }
    }

    /// Adds a row of raw text. Short rows are padded with empty, long rows
    /// truncated. Non-conforming values are coerced and counted.
    pub fn push_raw<S: AsRef<str>>(&mut self, raw: &[S]) {
        for (i, cache) in self.caches.iter_mut().enumerate() {
            let text = raw.get(i).map(|s| s.as_ref()).unwrap_or("");
            if cache.kind.try_coerce(text).is_none() {
                self.failures[i] += 1;
            }
            let id = cache.intern(cache.kind.coerce(text));
            self.ids[i].push(id);
        }
        self.row_count += 1;
    }

    /// Adds a row of already typed values.
    pub fn push_values(&mut self, values: Vec<Value>) -> Result<(), DatasetError> {
        if values.len() != self.caches.len() {
            return Err(DatasetError::ArityMismatch {
                expected: self.caches.len(),
                found: values.len(),
            });
        }
        for (i, value) in values.into_iter().enumerate() {
            let id = self.caches[i].intern(value);
            self.ids[i].push(id);
        }
        self.row_count += 1;
        Ok(())
    }

    /// Fields with at least one value that failed to parse, with counts.
    pub fn coercion_failures(&self) -> Vec<(&str, usize)> {
        self.caches
            .iter()
            .zip(&self.failures)
            .filter(|(_, &n)| n > 0)
            .map(|(c, &n)| (c.name.as_str(), n))
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn build(self) -> Dataset {
        let columns = self
            .caches
            .into_iter()
            .zip(self.ids)
            .map(|(cache, ids)| Arc::new(Column { cache: Arc::new(cache), ids }))
            .collect();
        let rows: Vec<u32> = (0..self.row_count as u32).collect();
        Dataset::from_parts(columns, rows.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields;

    fn sample() -> Dataset {
        let schema = Schema::new()
            .with_field(fields::HOTEL, FieldKind::Categorical)
            .with_field(fields::COUNTRY, FieldKind::Categorical)
            .with_field(fields::ADR, FieldKind::Float)
            .with_field(fields::IS_CANCELED, FieldKind::Boolean);
        let mut builder = DatasetBuilder::new(&schema);
        builder.push_raw(&["City Hotel", "PRT", "80.5", "1"]);
        builder.push_raw(&["City Hotel", "GBR", "bad", "0"]);
        builder.push_raw(&["Resort Hotel", "PRT", "120", "0"]);
        builder.push_raw(&["Resort Hotel", "FRA", "", "x"]);
        builder.push_raw(&["City Hotel", "PRT"]);
        builder.build()
    }

    #[test]
    fn test_builder_coerces_and_pads() {
        let ds = sample();
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.field_names(), vec!["hotel", "country", "adr", "is_canceled"]);
        assert_eq!(ds.value(0, fields::ADR).unwrap(), &Value::number(80.5));
        assert_eq!(ds.value(1, fields::ADR).unwrap(), &Value::Empty);
        assert_eq!(ds.value(3, fields::IS_CANCELED).unwrap(), &Value::Boolean(false));
        assert_eq!(ds.value(4, fields::ADR).unwrap(), &Value::Empty);
    }

    #[test]
    fn test_coercion_failures_counted() {
        let schema = Schema::new().with_field(fields::ADR, FieldKind::Float);
        let mut builder = DatasetBuilder::new(&schema);
        builder.push_raw(&["1.5"]);
        builder.push_raw(&["abc"]);
        builder.push_raw(&[""]);
        assert_eq!(builder.coercion_failures(), vec![("adr", 1)]);
    }

    #[test]
    fn test_filters_do_not_touch_source() {
        let ds = sample();
        let with_adr = ds.require(fields::ADR).unwrap();
        assert_eq!(with_adr.len(), 2);
        assert_eq!(ds.len(), 5);

        let prt = ds.filter_in(fields::COUNTRY, &["PRT"]).unwrap();
        assert_eq!(prt.len(), 3);
        let none = ds.filter_in(fields::COUNTRY, &["ESP"]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_unknown_field() {
        let ds = sample();
        assert_eq!(
            ds.require("missing").unwrap_err(),
            DatasetError::UnknownField("missing".to_string())
        );
    }

    #[test]
    fn test_top_values_breaks_ties_by_label() {
        let ds = sample();
        assert_eq!(ds.top_values(fields::COUNTRY, 2).unwrap(), vec!["PRT", "FRA"]);
        assert_eq!(ds.top_values(fields::COUNTRY, 10).unwrap().len(), 3);
    }

    #[test]
    fn test_virtual_field_after_filter() {
        let ds = sample().filter_in(fields::HOTEL, &["Resort Hotel"]).unwrap();
        let derived = ds.with_virtual_field("domestic", FieldKind::Boolean, FieldOrdering::Natural, |r| {
            Value::Boolean(r.get(fields::COUNTRY) == &Value::text("PRT"))
        });
        let values: Vec<&Value> = derived.records().map(|r| r.get("domestic")).collect();
        assert_eq!(values, vec![&Value::Boolean(true), &Value::Boolean(false)]);
        assert!(!ds.has_field("domestic"));
    }

    #[test]
    fn test_enumerated_field() {
        let ds = sample();
        let labels = ["low", "high"];
        let derived = ds.with_enumerated_field("adr_band", &labels, |r| {
            r.get(fields::ADR).as_f64().map(|adr| if adr < 100.0 { 0 } else { 1 })
        });
        let cache = derived.cache("adr_band").unwrap();
        assert_eq!(cache.unique_count(), 2);
        assert_eq!(derived.value(2, "adr_band").unwrap(), &Value::text("high"));
        assert_eq!(derived.value(1, "adr_band").unwrap(), &Value::Empty);
    }

    #[test]
    fn test_push_values_arity() {
        let schema = Schema::new().with_field(fields::HOTEL, FieldKind::Categorical);
        let mut builder = DatasetBuilder::new(&schema);
        let err = builder.push_values(vec![Value::text("A"), Value::text("B")]).unwrap_err();
        assert_eq!(err, DatasetError::ArityMismatch { expected: 1, found: 2 });
    }

    #[test]
    fn test_duplicate_headers_rejected() {
        let result = DatasetBuilder::with_headers(&["hotel", "hotel"], &Schema::bookings());
        assert!(matches!(result, Err(DatasetError::DuplicateField(_))));
    }
}

//! FILENAME: dataset/src/cache.rs
//! Field caches - per-column value interning.
//!
//! Each unique value is stored once and referenced by `ValueId`. Columns
//! hold vectors of IDs, so grouping hashes small integers instead of strings.
//!
//! Ordering of a field's values is a property of the cache:
//! - `Natural`: values compare by `Value::compare` (text lexically, dates
//!   chronologically).
//! - `Enumeration`: values compare by interning order. Bucket fields
//!   pre-intern their labels in defined order so "Jan" sorts before "Apr".
//!
//! A cache may also carry a single trailing value (e.g. a "Total" label) that
//! ranks after every other value and is never produced by interning.

use std::cmp::Ordering;
use std::sync::Arc;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use crate::schema::FieldKind;
use crate::value::Value;

// ============================================================================
// VALUE INTERNING
// ============================================================================

/// A reference to an interned value within a field's unique value store.
pub type ValueId = u32;

/// Represents a null or missing value.
pub const VALUE_ID_EMPTY: ValueId = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldOrdering {
    #[default]
    Natural,
    Enumeration,
}

// ============================================================================
// FIELD CACHE
// ============================================================================

/// Cache for a single field. Stores unique values with O(1) lookup both ways.
#[derive(Debug, Clone)]
pub struct FieldCache {
    pub name: String,
    pub kind: FieldKind,
    pub ordering: FieldOrdering,
    value_to_id: FxHashMap<Value, ValueId>,
    id_to_value: Vec<Value>,
    trailing: Option<ValueId>,
}

impl FieldCache {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldCache {
            name: name.into(),
            kind,
            ordering: FieldOrdering::Natural,
            value_to_id: FxHashMap::default(),
            id_to_value: Vec::new(),
            trailing: None,
        }
    }

    /// A cache whose labels are interned up front in enumeration order.
    pub fn enumerated<S: AsRef<str>>(name: impl Into<String>, labels: &[S]) -> Self {
        let mut cache = FieldCache::new(name, FieldKind::Categorical);
        cache.ordering = FieldOrdering::Enumeration;
        for label in labels {
            cache.intern(Value::text(label.as_ref()));
        }
        cache
    }

    /// Interns a value and returns its ValueId.
    /// If the value already exists, returns the existing ID.
    pub fn intern(&mut self, value: Value) -> ValueId {
        if value.is_empty() {
            return VALUE_ID_EMPTY;
        }

        if let Some(&id) = self.value_to_id.get(&value) {
            return id;
        }

        let id = self.id_to_value.len() as ValueId;
        self.id_to_value.push(value.clone());
        self.value_to_id.insert(value, id);
        id
    }

    /// Looks up an already-interned value.
    pub fn lookup(&self, value: &Value) -> Option<ValueId> {
        if value.is_empty() {
            return Some(VALUE_ID_EMPTY);
        }
        self.value_to_id.get(value).copied()
    }

    pub fn lookup_label(&self, label: &str) -> Option<ValueId> {
        self.id_to_value
            .iter()
            .position(|v| v.label() == label)
            .map(|i| i as ValueId)
            .filter(|id| Some(*id) != self.trailing)
    }

    /// Returns a copy of this cache carrying a trailing value with the given
    /// label, plus the ID assigned to it.
    pub fn with_trailing(&self, label: &str) -> (FieldCache, ValueId) {
        let mut cache = self.clone();
        if let Some(id) = cache.trailing {
            if cache.id_to_value[id as usize].label() == label {
                return (cache, id);
            }
        }
        let id = cache.id_to_value.len() as ValueId;
        cache.id_to_value.push(Value::text(label));
        cache.trailing = Some(id);
        (cache, id)
    }

    pub fn is_trailing(&self, id: ValueId) -> bool {
        self.trailing == Some(id)
    }

    /// Gets the value for a given ID.
    pub fn get_value(&self, id: ValueId) -> Option<&Value> {
        if id == VALUE_ID_EMPTY {
            return Some(&Value::Empty);
        }
        self.id_to_value.get(id as usize)
    }

    /// Label of an ID; unknown IDs render empty.
    pub fn label(&self, id: ValueId) -> String {
        self.get_value(id).map(Value::label).unwrap_or_default()
    }

    /// Returns the number of unique values (excluding empty).
    pub fn unique_count(&self) -> usize {
        self.id_to_value.len()
    }

    /// Compares two IDs of this field: empty first, trailing last, otherwise
    /// by the field's ordering policy.
    pub fn compare_ids(&self, a: ValueId, b: ValueId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        match (a == VALUE_ID_EMPTY, b == VALUE_ID_EMPTY) {
            (true, _) => return Ordering::Less,
            (_, true) => return Ordering::Greater,
            _ => {}
        }
        match (self.is_trailing(a), self.is_trailing(b)) {
            (true, _) => return Ordering::Greater,
            (_, true) => return Ordering::Less,
            _ => {}
        }
        match self.ordering {
            FieldOrdering::Enumeration => a.cmp(&b),
            FieldOrdering::Natural => match (self.get_value(a), self.get_value(b)) {
                (Some(va), Some(vb)) => Value::compare(va, vb).then(a.cmp(&b)),
                _ => a.cmp(&b),
            },
        }
    }

    /// Returns all IDs in sorted order.
    pub fn sorted_ids(&self) -> Vec<ValueId> {
        let mut ids: Vec<ValueId> = (0..self.id_to_value.len() as ValueId).collect();
        ids.sort_by(|&a, &b| self.compare_ids(a, b));
        ids
    }
}

// ============================================================================
// COLUMN
// ============================================================================

/// One physical column: a shared cache plus one ID per physical row.
#[derive(Debug, Clone)]
pub struct Column {
    pub cache: Arc<FieldCache>,
    pub ids: Vec<ValueId>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.cache.name
    }

    pub fn id_at(&self, physical_row: usize) -> ValueId {
        self.ids.get(physical_row).copied().unwrap_or(VALUE_ID_EMPTY)
    }

    pub fn value_at(&self, physical_row: usize) -> &Value {
        self.cache
            .get_value(self.id_at(physical_row))
            .unwrap_or(&Value::Empty)
    }
}

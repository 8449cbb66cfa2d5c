//! FILENAME: dataset/src/value.rs
//! Field values - the normalized, hashable representation of a booking field.
//!
//! Every cell of the dataset is coerced into a `Value` once, at load time.
//! Values are interned per field (see `cache.rs`), so they must be hashable
//! and totally ordered within a field.

use std::cmp::Ordering;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical date label format. Never carries a time-of-day component.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// VALUE
// ============================================================================

/// A single field value of a booking record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Integer(i64),
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn number(n: f64) -> Self {
        Value::Number(OrderedFloat(n))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric view used by aggregations. Booleans count as 1/0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(n.0),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The label used when the value becomes a grouping key or a column name.
    pub fn label(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => format_decimal(n.0),
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "True" } else { "False" }.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }

    /// Comparison function for sorting values of one field.
    /// Empty sorts first, then numbers, text, booleans and dates.
    pub fn compare(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Empty, Value::Empty) => Ordering::Equal,
            (Value::Empty, _) => Ordering::Less,
            (_, Value::Empty) => Ordering::Greater,

            (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
            (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => {
                let x = a.as_f64().unwrap_or(0.0);
                let y = b.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::Integer(_) | Value::Number(_), _) => Ordering::Less,
            (_, Value::Integer(_) | Value::Number(_)) => Ordering::Greater,

            (Value::Text(x), Value::Text(y)) => x.cmp(y),
            (Value::Text(_), _) => Ordering::Less,
            (_, Value::Text(_)) => Ordering::Greater,

            (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
            (Value::Boolean(_), _) => Ordering::Less,
            (_, Value::Boolean(_)) => Ordering::Greater,

            (Value::Date(x), Value::Date(y)) => x.cmp(y),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

// ============================================================================
// ORDERED FLOAT
// ============================================================================

/// Wrapper around f64 that implements Eq and Hash for use as HashMap keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // 0.0 and -0.0 compare equal, so they must hash equal
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl OrderedFloat {
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

// ============================================================================
// DECIMAL RENDERING
// ============================================================================

/// Renders a float the way delimited reports expect it: the shortest
/// representation that round-trips, with at least one fractional digit
/// (`50.0`, `66.67`, `0.0`).
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(format_decimal(50.0), "50.0");
        assert_eq!(format_decimal(66.67), "66.67");
        assert_eq!(format_decimal(0.0), "0.0");
        assert_eq!(format_decimal(-0.0), "0.0");
        assert_eq!(format_decimal(100.0), "100.0");
        assert_eq!(format_decimal(33.33), "33.33");
    }

    #[test]
    fn test_labels() {
        let date = NaiveDate::from_ymd_opt(2015, 7, 6).unwrap();
        assert_eq!(Value::Date(date).label(), "2015-07-06");
        assert_eq!(Value::Integer(12).label(), "12");
        assert_eq!(Value::text("City Hotel").label(), "City Hotel");
        assert_eq!(Value::Empty.label(), "");
    }

    #[test]
    fn test_compare_orders_kinds_and_values() {
        assert_eq!(Value::compare(&Value::Empty, &Value::Integer(0)), Ordering::Less);
        assert_eq!(Value::compare(&Value::Integer(2), &Value::number(1.5)), Ordering::Greater);
        assert_eq!(Value::compare(&Value::text("PRT"), &Value::text("ESP")), Ordering::Greater);
        assert_eq!(Value::compare(&Value::number(3.0), &Value::text("3")), Ordering::Less);

        let early = Value::Date(NaiveDate::from_ymd_opt(2015, 7, 1).unwrap());
        let late = Value::Date(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(Value::compare(&early, &late), Ordering::Less);
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Boolean(true).as_f64(), Some(1.0));
        assert_eq!(Value::Boolean(false).as_f64(), Some(0.0));
        assert_eq!(Value::text("12").as_f64(), None);
        assert_eq!(Value::Empty.as_f64(), None);
    }
}

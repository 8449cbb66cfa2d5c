//! FILENAME: dataset/src/schema.rs
//! Field declarations and raw-text coercion.
//!
//! Coercion never fails: a value that does not parse becomes `Value::Empty`
//! (or `false` for booleans). Reports that need the field drop such rows on
//! their own; the shared dataset is never touched.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use crate::value::Value;

/// Index of a field within a dataset's column list.
pub type FieldIndex = usize;

/// Names of the booking fields and of the fields the report pipeline derives.
pub mod fields {
    pub const IS_CANCELED: &str = "is_canceled";
    pub const HOTEL: &str = "hotel";
    pub const ORIGIN: &str = "origin";
    pub const COUNTRY: &str = "country";
    pub const TIPO: &str = "tipo";
    pub const PREVIOUS_CANCELLATIONS_GROUP: &str = "previous_cancellations_group";
    pub const FIRST_TIME_VISITOR: &str = "first_time_visitor";
    pub const ADR: &str = "adr";
    pub const DIA: &str = "dia";
    pub const LEAD_TIME: &str = "lead_time";

    // Derived
    pub const STATUS: &str = "Status";
    pub const LEAD_TIME_GROUP: &str = "lead_time_group";
    pub const WEEK: &str = "week";
    pub const MONTH_NAME: &str = "month_name";
}

// ============================================================================
// FIELD KIND
// ============================================================================

/// How raw text of a field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    #[default]
    Categorical,
    Boolean,
    Integer,
    Float,
    Date,
}

impl FieldKind {
    /// Parses raw text. `None` means the text was present but did not conform.
    pub fn try_coerce(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(Value::Empty);
        }

        match self {
            FieldKind::Categorical => Some(Value::Text(raw.to_string())),
            FieldKind::Boolean => parse_bool(raw).map(Value::Boolean),
            FieldKind::Integer => parse_integer(raw).map(Value::Integer),
            FieldKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::number),
            FieldKind::Date => parse_date(raw).map(Value::Date),
        }
    }

    /// Soft coercion: non-conforming text becomes empty, booleans become false.
    pub fn coerce(&self, raw: &str) -> Value {
        match self.try_coerce(raw) {
            Some(Value::Empty) if *self == FieldKind::Boolean => Value::Boolean(false),
            Some(value) => value,
            None if *self == FieldKind::Boolean => Value::Boolean(false),
            None => Value::Empty,
        }
    }
}

/// Numeric text is true when its integer part is non-zero: an
/// `is_canceled` of `2` is a cancellation, `0.4` is not.
fn parse_bool(raw: &str) -> Option<bool> {
    if let Ok(n) = raw.parse::<f64>() {
        if n.is_finite() {
            return Some(n.trunc() != 0.0);
        }
        return None;
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(i);
    }
    let n = raw.parse::<f64>().ok()?;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Accepts the date shapes found in booking exports. Time of day is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

// ============================================================================
// SCHEMA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

/// Ordered field declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == name) {
            existing.kind = kind;
        } else {
            self.fields.push(FieldDef { name, kind });
        }
        self
    }

    /// The known booking fields.
    pub fn bookings() -> Self {
        Schema::new()
            .with_field(fields::IS_CANCELED, FieldKind::Boolean)
            .with_field(fields::HOTEL, FieldKind::Categorical)
            .with_field(fields::ORIGIN, FieldKind::Categorical)
            .with_field(fields::COUNTRY, FieldKind::Categorical)
            .with_field(fields::TIPO, FieldKind::Categorical)
            .with_field(fields::PREVIOUS_CANCELLATIONS_GROUP, FieldKind::Categorical)
            .with_field(fields::FIRST_TIME_VISITOR, FieldKind::Categorical)
            .with_field(fields::ADR, FieldKind::Float)
            .with_field(fields::DIA, FieldKind::Date)
            .with_field(fields::LEAD_TIME, FieldKind::Integer)
    }

    /// Kind of a field; undeclared fields are categorical.
    pub fn kind_of(&self, name: &str) -> FieldKind {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.kind)
            .unwrap_or_default()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

//! FILENAME: pivot-engine/src/binning.rs
//! Category binning - manufactures ordered categorical fields from continuous
//! or coded ones.
//!
//! Every bucket field pre-interns its labels in enumeration order, so bucket
//! IDs sort in defined order ("Jan" before "Apr", "8-15" before "16-30")
//! regardless of label text.

use chrono::{Datelike, Duration, Month, NaiveDate};
use dataset::{fields, Dataset, FieldKind, FieldOrdering, RecordRef, Value};
use log::debug;
use crate::definition::DerivedField;
use crate::error::EngineError;

// ============================================================================
// LEAD TIME
// ============================================================================

/// Lead-time ranges in days, inclusive on both ends except the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LeadTimeBucket {
    SameDay,
    UpToWeek,
    UpToFortnight,
    UpToMonth,
    UpToQuarter,
    UpToHalfYear,
    UpToYear,
    OverYear,
}

impl LeadTimeBucket {
    pub const ALL: [LeadTimeBucket; 8] = [
        LeadTimeBucket::SameDay,
        LeadTimeBucket::UpToWeek,
        LeadTimeBucket::UpToFortnight,
        LeadTimeBucket::UpToMonth,
        LeadTimeBucket::UpToQuarter,
        LeadTimeBucket::UpToHalfYear,
        LeadTimeBucket::UpToYear,
        LeadTimeBucket::OverYear,
    ];

    /// `None` for negative day counts.
    pub fn from_days(days: i64) -> Option<Self> {
        let bucket = match days {
            d if d < 0 => return None,
            0 => LeadTimeBucket::SameDay,
            1..=7 => LeadTimeBucket::UpToWeek,
            8..=15 => LeadTimeBucket::UpToFortnight,
            16..=30 => LeadTimeBucket::UpToMonth,
            31..=90 => LeadTimeBucket::UpToQuarter,
            91..=180 => LeadTimeBucket::UpToHalfYear,
            181..=365 => LeadTimeBucket::UpToYear,
            _ => LeadTimeBucket::OverYear,
        };
        Some(bucket)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeadTimeBucket::SameDay => "0",
            LeadTimeBucket::UpToWeek => "1-7",
            LeadTimeBucket::UpToFortnight => "8-15",
            LeadTimeBucket::UpToMonth => "16-30",
            LeadTimeBucket::UpToQuarter => "31-90",
            LeadTimeBucket::UpToHalfYear => "91-180",
            LeadTimeBucket::UpToYear => "181-365",
            LeadTimeBucket::OverYear => "+365",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|b| b.label()).collect()
    }
}

// ============================================================================
// CALENDAR
// ============================================================================

/// Start (Monday) of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// English month names, January first.
pub fn month_names() -> Vec<&'static str> {
    (1..=12u8)
        .filter_map(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .collect()
}

// ============================================================================
// STATUS & ORIGIN
// ============================================================================

pub const STATUS_CANCELED: &str = "Canceled";
pub const STATUS_NOT_CANCELED: &str = "Not canceled";

/// Country code treated as domestic.
pub const DOMESTIC_COUNTRY: &str = "PRT";
pub const ORIGIN_DOMESTIC: &str = "Portugal";
pub const ORIGIN_INTERNATIONAL: &str = "International";

fn status_index(record: &RecordRef<'_>) -> Option<usize> {
    match record.get(fields::IS_CANCELED).as_f64() {
        Some(v) if v == 1.0 => Some(0),
        Some(v) if v == 0.0 => Some(1),
        _ => None,
    }
}

fn lead_time_index(record: &RecordRef<'_>) -> Option<usize> {
    let days = match record.get(fields::LEAD_TIME) {
        Value::Integer(d) => *d,
        other => {
            let n = other.as_f64()?;
            if n.fract() != 0.0 {
                return None;
            }
            n as i64
        }
    };
    LeadTimeBucket::from_days(days).map(|b| b.index())
}

// ============================================================================
// DERIVED FIELDS
// ============================================================================

impl DerivedField {
    /// Name of the field this derivation produces.
    pub fn output_field(&self) -> &'static str {
        match self {
            DerivedField::Status => fields::STATUS,
            DerivedField::Origin => fields::ORIGIN,
            DerivedField::LeadTimeGroup => fields::LEAD_TIME_GROUP,
            DerivedField::Week { .. } => fields::WEEK,
            DerivedField::Month { .. } => fields::MONTH_NAME,
        }
    }

    fn source_field(&self) -> &str {
        match self {
            DerivedField::Status => fields::IS_CANCELED,
            DerivedField::Origin => fields::COUNTRY,
            DerivedField::LeadTimeGroup => fields::LEAD_TIME,
            DerivedField::Week { source } | DerivedField::Month { source } => source.as_str(),
        }
    }
}

/// Returns `dataset` with the derived field added. The input is untouched.
pub fn apply_derived_field(dataset: &Dataset, derived: &DerivedField) -> Result<Dataset, EngineError> {
    if *derived == DerivedField::Origin && dataset.has_field(fields::ORIGIN) {
        debug!("origin already present, not derived from country");
        return Ok(dataset.clone());
    }

    let source = derived.source_field();
    dataset.field_index(source)?;

    let result = match derived {
        DerivedField::Status => dataset.with_enumerated_field(
            fields::STATUS,
            &[STATUS_CANCELED, STATUS_NOT_CANCELED],
            status_index,
        ),
        DerivedField::Origin => dataset.with_virtual_field(
            fields::ORIGIN,
            FieldKind::Categorical,
            FieldOrdering::Natural,
            |r| {
                let domestic = matches!(r.get(fields::COUNTRY), Value::Text(c) if c == DOMESTIC_COUNTRY);
                Value::text(if domestic { ORIGIN_DOMESTIC } else { ORIGIN_INTERNATIONAL })
            },
        ),
        DerivedField::LeadTimeGroup => dataset.with_enumerated_field(
            fields::LEAD_TIME_GROUP,
            &LeadTimeBucket::labels(),
            lead_time_index,
        ),
        DerivedField::Week { source } => dataset.with_virtual_field(
            fields::WEEK,
            FieldKind::Date,
            FieldOrdering::Natural,
            |r| match r.get(source).as_date() {
                Some(date) => Value::Date(week_start(date)),
                None => Value::Empty,
            },
        ),
        DerivedField::Month { source } => dataset.with_enumerated_field(
            fields::MONTH_NAME,
            &month_names(),
            |r| r.get(source).as_date().map(|d| d.month0() as usize),
        ),
    };

    debug!("derived field '{}' from '{}'", derived.output_field(), source);
    Ok(result)
}

//! FILENAME: pivot-engine/src/view.rs
//! Report View - The renderable output of one report.
//!
//! A `ReportView` is a plain header + rows grid. Headers are already
//! presentation labels, numbers are already rounded. Writers only need
//! `ReportCell::render`.

use serde::{Deserialize, Serialize};
use dataset::{format_decimal, Value};

// ============================================================================
// CELLS
// ============================================================================

/// Display value for a report cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportCell {
    Empty,
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl ReportCell {
    pub fn text(s: impl Into<String>) -> Self {
        ReportCell::Text(s.into())
    }

    /// Delimited-text rendering: integers plain, decimals with at least one
    /// fractional digit, empty as an empty field.
    pub fn render(&self) -> String {
        match self {
            ReportCell::Empty => String::new(),
            ReportCell::Text(s) => s.clone(),
            ReportCell::Integer(i) => i.to_string(),
            ReportCell::Decimal(d) => format_decimal(*d),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReportCell::Integer(i) => Some(*i as f64),
            ReportCell::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&Value> for ReportCell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Empty => ReportCell::Empty,
            Value::Integer(i) => ReportCell::Integer(*i),
            Value::Number(n) => ReportCell::Decimal(n.0),
            other => ReportCell::Text(other.label()),
        }
    }
}

// ============================================================================
// VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    /// Report identifier, used as the output file stem.
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ReportCell>>,
}

impl ReportView {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        ReportView {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&ReportCell> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    /// First row whose cells in `columns` render as `labels`.
    pub fn find_row(&self, columns: &[&str], labels: &[&str]) -> Option<&[ReportCell]> {
        let positions: Vec<usize> = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Option<_>>()?;
        self.rows
            .iter()
            .find(|row| {
                positions
                    .iter()
                    .zip(labels)
                    .all(|(&p, label)| row[p].render() == *label)
            })
            .map(|row| row.as_slice())
    }

    /// Every cell of one column, rendered.
    pub fn column_values(&self, column: &str) -> Vec<String> {
        match self.column_index(column) {
            Some(col) => self.rows.iter().map(|r| r[col].render()).collect(),
            None => Vec::new(),
        }
    }
}

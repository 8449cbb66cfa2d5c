//! FILENAME: pivot-engine/src/format.rs
//! Table formatting - turns aggregations and wide tables into report views.
//!
//! Steps, in order: build an internal frame (key columns, metric columns),
//! collapse keys into a label column, prepend a constant column, select and
//! reorder columns, melt, and finally rename headers to display labels.
//! Decimal metrics are rounded half away from zero at 2 places here and
//! nowhere else.

use dataset::Dataset;
use crate::aggregate::Aggregation;
use crate::definition::{MetricFormat, OutputSpec};
use crate::error::EngineError;
use crate::pivot::WideTable;
use crate::view::{ReportCell, ReportView};

// ============================================================================
// DISPLAY NAMES & ROUNDING
// ============================================================================

/// Internal column name -> presentation label.
pub const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("country", "Country"),
    ("hotel", "Hotel"),
    ("tipo", "Trip Type"),
    ("origin", "Origin"),
    ("Canceled_value", "Canceled"),
    ("Not_canceled_value", "Not Canceled"),
    ("Canceled_Percentage", "Canceled %"),
    ("Not_canceled_Percentage", "Not Canceled %"),
    ("count", "Count"),
    ("percentage", "Percentage"),
    ("lead_time_group", "Lead Time"),
    ("cancel_rate", "% Cancellations"),
    ("month_name", "Month"),
];

/// Presentation label for a column; unmapped names pass through.
pub fn display_name(name: &str) -> String {
    DISPLAY_NAMES
        .iter()
        .find(|(internal, _)| *internal == name)
        .map(|(_, display)| display.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Rounds half away from zero.
pub fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // keep -0.0 out of the output
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn metric_cell(value: f64, format: MetricFormat) -> ReportCell {
    match format {
        MetricFormat::Integer => ReportCell::Integer(value.round() as i64),
        MetricFormat::Decimal => ReportCell::Decimal(round_half_up(value, 2)),
    }
}

// ============================================================================
// FRAME
// ============================================================================

/// Intermediate table: key columns, then metric columns.
#[derive(Debug, Clone)]
struct Frame {
    keys: Vec<String>,
    metrics: Vec<String>,
    rows: Vec<Vec<ReportCell>>,
}

impl Frame {
    fn columns(&self) -> Vec<String> {
        self.keys.iter().chain(&self.metrics).cloned().collect()
    }

    /// Replaces every key column by one dash-joined label column.
    fn collapse_keys(&mut self, label_column: &str) {
        let key_count = self.keys.len();
        for row in self.rows.iter_mut() {
            let label = row[..key_count]
                .iter()
                .map(|c| c.render())
                .collect::<Vec<_>>()
                .join("-");
            let metrics = row.split_off(key_count);
            *row = std::iter::once(ReportCell::Text(label)).chain(metrics).collect();
        }
        self.keys = vec![label_column.to_string()];
    }

    fn prepend_constant(&mut self, column: &str, value: &str) {
        for row in self.rows.iter_mut() {
            row.insert(0, ReportCell::text(value));
        }
        self.keys.insert(0, column.to_string());
    }

    /// Keeps the named columns in the given order; unknown names are skipped.
    fn select(&mut self, wanted: &[String]) {
        let current = self.columns();
        let picks: Vec<usize> = wanted
            .iter()
            .filter_map(|name| current.iter().position(|c| c == name))
            .collect();

        let key_count = self.keys.len();
        self.keys = picks.iter().filter(|&&p| p < key_count).map(|&p| current[p].clone()).collect();
        self.metrics = picks.iter().filter(|&&p| p >= key_count).map(|&p| current[p].clone()).collect();

        // keys stay in front of metrics
        let ordered: Vec<usize> = picks
            .iter()
            .filter(|&&p| p < key_count)
            .chain(picks.iter().filter(|&&p| p >= key_count))
            .copied()
            .collect();
        for row in self.rows.iter_mut() {
            *row = ordered.iter().map(|&p| row[p].clone()).collect();
        }
    }

    /// Metric columns become (variable, value) rows, one block per metric.
    fn melt(&mut self, variable: &str, value: &str) {
        let key_count = self.keys.len();
        let mut melted = Vec::with_capacity(self.rows.len() * self.metrics.len());
        for (m, metric) in self.metrics.iter().enumerate() {
            for row in &self.rows {
                let mut out: Vec<ReportCell> = row[..key_count].to_vec();
                out.push(ReportCell::text(metric.as_str()));
                out.push(row[key_count + m].clone());
                melted.push(out);
            }
        }
        self.keys.push(variable.to_string());
        self.metrics = vec![value.to_string()];
        self.rows = melted;
    }

    fn finish(mut self, name: &str, output: &OutputSpec) -> ReportView {
        if let Some(label) = &output.label_column {
            self.collapse_keys(label);
        }
        if let Some(constant) = &output.constant_column {
            self.prepend_constant(&constant.column, &constant.value);
        }
        if let Some(columns) = &output.columns {
            self.select(columns);
        }
        if let Some(melt) = &output.melt {
            self.melt(&melt.variable, &melt.value);
        }

        let mut columns = self.columns();
        if output.display_names {
            columns = columns.iter().map(|c| display_name(c)).collect();
        }
        ReportView {
            name: name.to_string(),
            columns,
            rows: self.rows,
        }
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Long format: key dimensions then every metric, one row per group.
pub fn format_long(name: &str, aggregation: &Aggregation, output: &OutputSpec) -> ReportView {
    let metric_columns = aggregation.metric_columns();
    let rows = aggregation
        .rows
        .iter()
        .map(|row| {
            let keys = (0..aggregation.dimensions.len()).map(|p| ReportCell::Text(aggregation.key_label(row, p)));
            let metrics = metric_columns
                .iter()
                .zip(&row.values)
                .map(|((_, format), &v)| metric_cell(v, *format));
            keys.chain(metrics).collect()
        })
        .collect();

    Frame {
        keys: aggregation.dimensions.clone(),
        metrics: metric_columns.into_iter().map(|(n, _)| n).collect(),
        rows,
    }
    .finish(name, output)
}

/// Wide format: key dimensions then the pivoted columns.
pub fn format_wide(name: &str, table: &WideTable, output: &OutputSpec) -> ReportView {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let keys = (0..table.key_dimensions.len()).map(|p| ReportCell::Text(table.key_label(row, p)));
            let cells = table
                .columns
                .iter()
                .zip(&row.cells)
                .map(|(column, &v)| metric_cell(v, column.format));
            keys.chain(cells).collect()
        })
        .collect();

    Frame {
        keys: table.key_dimensions.clone(),
        metrics: table.columns.iter().map(|c| c.name.clone()).collect(),
        rows,
    }
    .finish(name, output)
}

/// One row per record: dimension labels then the raw value, unrounded.
pub fn format_listing(
    name: &str,
    dataset: &Dataset,
    dimensions: &[String],
    value_field: &str,
    output: &OutputSpec,
) -> Result<ReportView, EngineError> {
    let dim_indices = dimensions
        .iter()
        .map(|d| dataset.field_index(d).map_err(|_| EngineError::UnknownDimension(d.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    let value_index = dataset.field_index(value_field)?;

    let rows = dataset
        .records()
        .map(|record| {
            dim_indices
                .iter()
                .map(|&i| ReportCell::Text(record.value_at(i).label()))
                .chain(std::iter::once(ReportCell::from(record.value_at(value_index))))
                .collect()
        })
        .collect();

    Ok(Frame {
        keys: dimensions.to_vec(),
        metrics: vec![value_field.to_string()],
        rows,
    }
    .finish(name, output))
}

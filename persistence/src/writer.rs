//! FILENAME: persistence/src/writer.rs

use crate::{PersistenceError, REPORT_EXTENSION};
use log::info;
use pivot_engine::ReportView;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// ============================================================================
// WRITER TRAIT
// ============================================================================

/// Destination for finished reports.
pub trait ReportWriter {
    fn write_report(&mut self, view: &ReportView) -> Result<(), PersistenceError>;

    fn write_all(&mut self, views: &[ReportView]) -> Result<(), PersistenceError> {
        for view in views {
            self.write_report(view)?;
        }
        Ok(())
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Writes each report as a header row followed by its rendered rows.
pub struct CsvReportWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> CsvReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_delimiter(writer, b',')
    }

    pub fn with_delimiter(writer: W, delimiter: u8) -> Self {
        let inner = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_writer(writer);
        CsvReportWriter { inner }
    }

    /// Flushes and hands back the underlying writer.
    pub fn into_inner(self) -> Result<W, PersistenceError> {
        self.inner
            .into_inner()
            .map_err(|e| PersistenceError::Io(e.into_error()))
    }
}

impl<W: Write> ReportWriter for CsvReportWriter<W> {
    fn write_report(&mut self, view: &ReportView) -> Result<(), PersistenceError> {
        self.inner.write_record(&view.columns)?;
        for row in &view.rows {
            self.inner.write_record(row.iter().map(|cell| cell.render()))?;
        }
        self.inner.flush()?;
        Ok(())
    }
}

// ============================================================================
// DIRECTORY
// ============================================================================

/// Writes every report to `<dir>/<report name>.csv`, creating `dir` on first use.
pub struct DirectoryWriter {
    dir: PathBuf,
    delimiter: u8,
    written: Vec<PathBuf>,
}

impl DirectoryWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryWriter {
            dir: dir.into(),
            delimiter: b',',
            written: Vec::new(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, report_name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", report_name, REPORT_EXTENSION))
    }

    /// Files written so far, in write order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ReportWriter for DirectoryWriter {
    fn write_report(&mut self, view: &ReportView) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&view.name);

        let file = BufWriter::new(File::create(&path)?);
        let mut writer = CsvReportWriter::with_delimiter(file, self.delimiter);
        writer.write_report(view)?;
        writer.into_inner()?.flush()?;

        info!("Wrote report '{}' ({} rows) to {}", view.name, view.row_count(), path.display());
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivot_engine::ReportCell;

    fn sample_view() -> ReportView {
        let mut view = ReportView::new(
            "by_hotel",
            vec!["Hotel".to_string(), "Canceled".to_string(), "Canceled %".to_string()],
        );
        view.rows.push(vec![ReportCell::text("City Hotel"), ReportCell::Integer(3), ReportCell::Decimal(50.0)]);
        view.rows.push(vec![ReportCell::text("Resort, Algarve"), ReportCell::Integer(1), ReportCell::Decimal(33.33)]);
        view.rows.push(vec![ReportCell::Empty, ReportCell::Integer(0), ReportCell::Decimal(0.0)]);
        view
    }

    fn written_text(view: &ReportView, delimiter: u8) -> String {
        let mut writer = CsvReportWriter::with_delimiter(Vec::new(), delimiter);
        writer.write_report(view).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_csv_rendering() {
        let text = written_text(&sample_view(), b',');
        assert_eq!(
            text,
            "Hotel,Canceled,Canceled %\n\
             City Hotel,3,50.0\n\
             \"Resort, Algarve\",1,33.33\n\
             ,0,0.0\n"
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let text = written_text(&sample_view(), b';');
        assert!(text.starts_with("Hotel;Canceled;Canceled %\n"));
        assert!(text.contains("Resort, Algarve;1;33.33"));
    }

    #[test]
    fn test_header_only_for_empty_view() {
        let view = ReportView::new("empty", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(written_text(&view, b','), "a,b\n");
    }

    #[test]
    fn test_directory_writer_names_files_after_reports() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("reports");
        let mut writer = DirectoryWriter::new(&out);

        writer.write_report(&sample_view()).unwrap();
        let path = out.join("by_hotel.csv");
        assert_eq!(writer.written(), &[path.clone()]);

        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("Hotel,Canceled,Canceled %\n"));
        assert_eq!(text.lines().count(), 4);
    }
}

//! Row output writers

use crate::QuestionRow;
use std::path::Path;

pub mod csv;
pub mod xlsx;

/// Column headers, in output order
pub const COLUMNS: [&str; 8] = [
    "Course name",
    "Course code",
    "Exam name",
    "Guess correction",
    "Exercise name",
    "Question type",
    "Question points",
    "Question guess score",
];

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Workbook write error
    #[error("XLSX error: {0}")]
    XlsxError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Writer for flattened question rows
pub trait RowsWriter: OutputWriter {
    /// Write a single row
    fn write_row(&mut self, row: &QuestionRow) -> OutputResult<()>;

    /// Write multiple rows at once
    fn write_rows(&mut self, rows: &[QuestionRow]) -> OutputResult<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }
}

/// File format of the export, chosen from the output path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Delimited text
    Csv,
    /// Excel workbook with typed cells
    Xlsx,
}

impl OutputFormat {
    /// `.xlsx` (any case) selects a workbook, every other path CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => OutputFormat::Xlsx,
            _ => OutputFormat::Csv,
        }
    }
}

/// Write `rows` to `path` in the format its extension selects
///
/// `delimiter` only applies to CSV output.
pub fn write_rows_to<P: AsRef<Path>>(
    path: P,
    rows: &[QuestionRow],
    delimiter: u8,
) -> OutputResult<u64> {
    let path = path.as_ref();
    match OutputFormat::from_path(path) {
        OutputFormat::Csv => csv::write_rows_csv(path, rows, delimiter),
        OutputFormat::Xlsx => xlsx::write_rows_xlsx(path, rows),
    }
}

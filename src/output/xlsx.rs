//! Excel workbook writer
//!
//! Cells are typed: points and guess scores are numbers, guess correction is
//! a boolean, everything else is text. Missing values leave the cell blank.
//! The workbook is assembled in memory and saved on [`OutputWriter::close`].

use crate::QuestionRow;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, RowsWriter, COLUMNS};

/// Name of the single worksheet
pub const SHEET_NAME: &str = "Questions";

/// Excel writer for question rows
pub struct XlsxRowsWriter {
    workbook: Workbook,
    path: PathBuf,
    rows_written: u64,
}

fn xlsx_err(context: &str) -> impl Fn(XlsxError) -> OutputError + '_ {
    move |e| OutputError::XlsxError(format!("{context}: {e}"))
}

impl XlsxRowsWriter {
    /// Create a workbook that will be saved at `path`
    ///
    /// Parent directories are created when missing and the header row is
    /// written immediately.
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating XLSX writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(SHEET_NAME)
            .map_err(xlsx_err("Failed to name worksheet"))?;
        for (col, header) in COLUMNS.iter().enumerate() {
            sheet
                .write_string(0, col as u16, *header)
                .map_err(xlsx_err("Failed to write header"))?;
        }

        Ok(Self {
            workbook,
            path: path.to_path_buf(),
            rows_written: 0,
        })
    }

    /// Number of rows written so far (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn sheet(&mut self) -> OutputResult<&mut Worksheet> {
        self.workbook
            .worksheet_from_index(0)
            .map_err(xlsx_err("Missing worksheet"))
    }
}

fn write_text(sheet: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> OutputResult<()> {
    if let Some(value) = value {
        sheet
            .write_string(row, col, value)
            .map_err(xlsx_err("Failed to write cell"))?;
    }
    Ok(())
}

fn write_decimal(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<Decimal>,
) -> OutputResult<()> {
    match value.and_then(|d| d.to_f64()) {
        Some(number) => {
            sheet
                .write_number(row, col, number)
                .map_err(xlsx_err("Failed to write cell"))?;
        }
        // Out of f64 range: keep the exact text rather than dropping it
        None => write_text(sheet, row, col, value.map(|d| d.to_string()).as_deref())?,
    }
    Ok(())
}

impl RowsWriter for XlsxRowsWriter {
    fn write_row(&mut self, row: &QuestionRow) -> OutputResult<()> {
        let index = u32::try_from(self.rows_written + 1)
            .map_err(|_| OutputError::XlsxError("too many rows for one worksheet".to_string()))?;
        let sheet = self.sheet()?;

        write_text(sheet, index, 0, row.course_name.as_deref())?;
        write_text(sheet, index, 1, row.course_code.as_deref())?;
        write_text(sheet, index, 2, row.exam_name.as_deref())?;
        if let Some(flag) = row.guess_correction {
            sheet
                .write_boolean(index, 3, flag)
                .map_err(xlsx_err("Failed to write cell"))?;
        }
        write_text(sheet, index, 4, row.exercise_name.as_deref())?;
        write_text(sheet, index, 5, row.question_type.as_deref())?;
        write_decimal(sheet, index, 6, row.question_points)?;
        write_decimal(sheet, index, 7, row.question_guess_score)?;

        self.rows_written += 1;
        Ok(())
    }
}

impl OutputWriter for XlsxRowsWriter {
    fn flush(&mut self) -> OutputResult<()> {
        // Workbooks are written in one piece on close
        debug!("XLSX flush deferred: {} rows buffered", self.rows_written);
        Ok(())
    }

    fn close(mut self) -> OutputResult<()> {
        self.workbook
            .save(&self.path)
            .map_err(xlsx_err("Failed to save workbook"))?;

        info!("XLSX writer closed: {} rows written", self.rows_written);
        Ok(())
    }
}

/// Write all `rows` to a workbook at `path` and return the number of rows written
pub fn write_rows_xlsx<P: AsRef<Path>>(path: P, rows: &[QuestionRow]) -> OutputResult<u64> {
    let mut writer = XlsxRowsWriter::new(path)?;
    writer.write_rows(rows)?;
    let written = writer.rows_written();
    writer.close()?;
    Ok(written)
}

//! CSV output writer

use crate::QuestionRow;
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, RowsWriter, COLUMNS};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Flush every N rows
const FLUSH_INTERVAL: u64 = 1_000;

/// CSV record for one question row
///
/// Field order must match [`COLUMNS`]; the header row is written from there.
#[derive(Debug, Serialize)]
struct QuestionRecord<'a> {
    course_name: Option<&'a str>,
    course_code: Option<&'a str>,
    exam_name: Option<&'a str>,
    guess_correction: Option<bool>,
    exercise_name: Option<&'a str>,
    question_type: Option<&'a str>,
    question_points: Option<String>,
    question_guess_score: Option<String>,
}

impl<'a> From<&'a QuestionRow> for QuestionRecord<'a> {
    fn from(row: &'a QuestionRow) -> Self {
        Self {
            course_name: row.course_name.as_deref(),
            course_code: row.course_code.as_deref(),
            exam_name: row.exam_name.as_deref(),
            guess_correction: row.guess_correction,
            exercise_name: row.exercise_name.as_deref(),
            question_type: row.question_type.as_deref(),
            question_points: row.question_points.map(|p| p.normalize().to_string()),
            question_guess_score: row.question_guess_score.map(|g| g.normalize().to_string()),
        }
    }
}

/// CSV writer for question rows
pub struct CsvRowsWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvRowsWriter {
    /// Create a comma-separated writer at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Self::with_delimiter(path, b',')
    }

    /// Create a writer with a custom field delimiter
    ///
    /// Parent directories are created when missing and the header row is
    /// written immediately, so an export without rows still has headers.
    pub fn with_delimiter<P: AsRef<Path>>(path: P, delimiter: u8) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(buf_writer);

        writer
            .write_record(COLUMNS)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Number of rows written so far (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl RowsWriter for CsvRowsWriter {
    fn write_row(&mut self, row: &QuestionRow) -> OutputResult<()> {
        self.writer
            .serialize(QuestionRecord::from(row))
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;

        self.rows_written += 1;

        if self.rows_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!("Progress: {} rows written", self.rows_written);
        }

        Ok(())
    }
}

impl OutputWriter for CsvRowsWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;

        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!("CSV writer closed: {} rows written", self.rows_written);
        Ok(())
    }
}

/// Write all `rows` to `path` and return the number of rows written
pub fn write_rows_csv<P: AsRef<Path>>(
    path: P,
    rows: &[QuestionRow],
    delimiter: u8,
) -> OutputResult<u64> {
    let mut writer = CsvRowsWriter::with_delimiter(path, delimiter)?;
    writer.write_rows(rows)?;
    let written = writer.rows_written();
    writer.close()?;
    Ok(written)
}

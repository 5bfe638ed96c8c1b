//! # Assessment Exporter Library
//!
//! Retrieves assessment data from a paginated REST API (courses, exams,
//! exercises and questions), flattens the four-level hierarchy into one row
//! per question and writes the result as a spreadsheet.
//!
//! ## Features
//!
//! - **Generic Pagination**: One page-numbered fetch loop shared by every resource level
//! - **Rate Limiting**: Server-directed waits on 429 responses plus quota-header pacing
//! - **Flattening**: Course, exam and exercise attributes carried down to each question row
//! - **Spreadsheet Export**: Excel workbook with typed cells, or CSV, in a fixed column order
//! - **Bounded Concurrency**: Optional parallel course fetches sharing one rate-limit view
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use assessment_exporter::fetcher::http::ApiHttpClient;
//! use assessment_exporter::output::csv::CsvRowsWriter;
//! use assessment_exporter::output::{OutputWriter, RowsWriter};
//! use assessment_exporter::{ApiConfig, AssessmentExporter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::new("https://ans.uva.nl/api/v2", 12, "secret-token");
//! let transport = Arc::new(ApiHttpClient::new(&config)?);
//!
//! let report = AssessmentExporter::new(transport, &config).collect().await?;
//!
//! let mut writer = CsvRowsWriter::new("./toetsen.csv")?;
//! writer.write_rows(&report.rows)?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - API configuration, HTTP transport and the generic paginator
//! - [`export`] - Rate-limit governor and the flattening aggregator
//! - [`output`] - Row writers (XLSX and CSV)
//! - [`cli`] - Command-line interface
//! - [`metrics`] - Counters and histograms for requests and pauses
//! - [`shutdown`] - Ctrl+C coordination

#![warn(missing_docs)]
#![warn(clippy::all)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// CLI command implementation
pub mod cli;

/// Rate limiting and hierarchy flattening
pub mod export;

/// API configuration, transport and pagination
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Row output writers
pub mod output;

/// Graceful shutdown coordination
pub mod shutdown;

pub use export::{AssessmentExporter, ExportError, ExportReport, ExportStats};
pub use fetcher::api_config::{ApiConfig, Resource};

/// Identifier the API uses for the placeholder exercise of an assignment
/// without exercises.
pub const EMPTY_EXERCISE_ID: u64 = 0;

/// Course record, root of the hierarchy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    /// Course identifier
    pub id: u64,
    /// Display name
    #[serde(default, deserialize_with = "fetcher::lenient::text")]
    pub name: Option<String>,
    /// Course code (e.g. "5082ALG6Y")
    #[serde(default, deserialize_with = "fetcher::lenient::text")]
    pub course_code: Option<String>,
}

/// Grade settings nested inside an assignment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GradesSettings {
    /// Whether guessing correction is applied to the score
    #[serde(default, deserialize_with = "fetcher::lenient::flag")]
    pub guess_correction: Option<bool>,
}

/// Assignment (exam) record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    /// Assignment identifier
    pub id: u64,
    /// Exam name
    #[serde(default, deserialize_with = "fetcher::lenient::text")]
    pub name: Option<String>,
    /// Grade settings; every assignment returned by the API is expected to carry them
    #[serde(default)]
    pub grades_settings: Option<GradesSettings>,
}

/// Exercise record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    /// Exercise identifier
    pub id: u64,
    /// Exercise name
    #[serde(default, deserialize_with = "fetcher::lenient::text")]
    pub name: Option<String>,
}

impl Exercise {
    /// Whether this is the placeholder standing in for "no exercises"
    pub fn is_empty_marker(&self) -> bool {
        self.id == EMPTY_EXERCISE_ID
    }
}

/// Question record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Question type (e.g. "multiple_choice", "open")
    #[serde(default, deserialize_with = "fetcher::lenient::text")]
    pub category: Option<String>,
    /// Maximum points
    #[serde(default, deserialize_with = "fetcher::lenient::decimal")]
    pub points: Option<Decimal>,
    /// Score a random guess is expected to earn
    #[serde(default, deserialize_with = "fetcher::lenient::decimal")]
    pub guess_score: Option<Decimal>,
}

/// One denormalized output row: a question with its ancestors' attributes
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRow {
    /// Course name
    pub course_name: Option<String>,
    /// Course code
    pub course_code: Option<String>,
    /// Exam (assignment) name
    pub exam_name: Option<String>,
    /// Guess-correction flag of the exam
    pub guess_correction: Option<bool>,
    /// Exercise name
    pub exercise_name: Option<String>,
    /// Question type
    pub question_type: Option<String>,
    /// Question points
    pub question_points: Option<Decimal>,
    /// Question guess score
    pub question_guess_score: Option<Decimal>,
}

impl QuestionRow {
    /// Build a row from a question and the records enclosing it
    pub fn new(
        course: &Course,
        assignment: &Assignment,
        guess_correction: Option<bool>,
        exercise: &Exercise,
        question: &Question,
    ) -> Self {
        Self {
            course_name: course.name.clone(),
            course_code: course.course_code.clone(),
            exam_name: assignment.name.clone(),
            guess_correction,
            exercise_name: exercise.name.clone(),
            question_type: question.category.clone(),
            question_points: question.points,
            question_guess_score: question.guess_score,
        }
    }
}

//! Hierarchy walk and flattening
//!
//! Drives the paginator through the four resource levels and turns every
//! question into a [`QuestionRow`]. Courses are processed in the order the
//! API returns them; with a concurrency above 1 several courses are fetched
//! at once through an ordered buffered stream, so the row order never
//! depends on timing.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::export::rate_limit::RateLimitGovernor;
use crate::export::ExportError;
use crate::fetcher::api_config::{ApiConfig, Resource};
use crate::fetcher::pagination::Paginator;
use crate::fetcher::PageTransport;
use crate::shutdown::SharedShutdown;
use crate::{Assignment, Course, Exercise, Question, QuestionRow};

/// Counters describing one export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Courses returned for the school
    pub courses: u64,
    /// Assignments across all courses
    pub assignments: u64,
    /// Exercises expanded into question fetches
    pub exercises: u64,
    /// Questions fetched (equals the number of rows)
    pub questions: u64,
    /// Assignments whose exercise set was empty
    pub empty_assignments: u64,
    /// Paginated fetches cut short by a local failure
    pub failed_fetches: u64,
    /// Whether the walk stopped early on a shutdown request
    pub cancelled: bool,
}

impl ExportStats {
    fn merge(&mut self, other: &ExportStats) {
        self.assignments += other.assignments;
        self.exercises += other.exercises;
        self.questions += other.questions;
        self.empty_assignments += other.empty_assignments;
        self.failed_fetches += other.failed_fetches;
    }
}

/// Rows collected by a run
#[derive(Debug, Default)]
pub struct ExportReport {
    /// One row per question, in hierarchy order
    pub rows: Vec<QuestionRow>,
    /// Run counters
    pub stats: ExportStats,
}

/// Exercises of one assignment
#[derive(Debug, PartialEq)]
enum ExerciseSet {
    /// The assignment has no exercises
    Empty,
    /// Real exercises, in API order
    Exercises(Vec<Exercise>),
}

impl ExerciseSet {
    /// Classify a fetched exercise list
    ///
    /// Any occurrence of the placeholder id marks the whole set as empty.
    fn from_fetched(exercises: Vec<Exercise>) -> Self {
        if exercises.is_empty() || exercises.iter().any(Exercise::is_empty_marker) {
            ExerciseSet::Empty
        } else {
            ExerciseSet::Exercises(exercises)
        }
    }
}

/// Walks courses → assignments → exercises → questions for one school
pub struct AssessmentExporter {
    paginator: Paginator,
    school_id: u64,
    concurrency: usize,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
}

impl AssessmentExporter {
    /// Create an exporter with its own rate-limit governor
    pub fn new(transport: Arc<dyn PageTransport>, config: &ApiConfig) -> Self {
        let governor = Arc::new(RateLimitGovernor::new());
        Self::from_paginator(Paginator::new(transport, governor, config), config.school_id)
    }

    /// Create an exporter around an existing paginator
    pub fn from_paginator(paginator: Paginator, school_id: u64) -> Self {
        Self {
            paginator,
            school_id,
            concurrency: 1,
            shutdown: None,
            progress: None,
        }
    }

    /// Number of courses fetched at the same time (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stop early once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Report per-course progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Walk the whole hierarchy and return one row per question
    ///
    /// # Errors
    /// Fails on fatal fetch errors and on assignments without `grades_settings`.
    pub async fn collect(&self) -> Result<ExportReport, ExportError> {
        let mut stats = ExportStats::default();

        let courses = self.fetch_courses(&mut stats).await?;
        stats.courses = courses.len() as u64;
        info!(
            school_id = self.school_id,
            base_url = self.paginator.base_url(),
            "Found {} courses",
            courses.len()
        );

        if let Some(progress) = &self.progress {
            progress.set_length(courses.len() as u64);
        }

        let mut rows = Vec::new();
        let mut per_course = stream::iter(courses.iter())
            .map(|course| self.collect_course(course))
            .buffered(self.concurrency);

        while let Some(result) = per_course.next().await {
            let report = result?;
            stats.merge(&report.stats);
            rows.extend(report.rows);

            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
        }

        stats.cancelled = self.is_cancelled();
        if stats.cancelled {
            warn!("Export interrupted; keeping {} rows collected so far", rows.len());
        }
        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        Ok(ExportReport { rows, stats })
    }

    async fn collect_course(&self, course: &Course) -> Result<ExportReport, ExportError> {
        let mut report = ExportReport::default();
        if self.is_cancelled() {
            return Ok(report);
        }

        if let Some(progress) = &self.progress {
            progress.set_message(course.name.clone().unwrap_or_default());
        }
        debug!(
            course_id = course.id,
            "Processing course {}",
            course.name.as_deref().unwrap_or("<unnamed>")
        );

        let assignments: Vec<Assignment> = self
            .fetch_children(Resource::Assignments, course.id, &mut report.stats)
            .await?
            .unwrap_or_default();
        report.stats.assignments = assignments.len() as u64;

        for assignment in &assignments {
            if self.is_cancelled() {
                break;
            }

            let guess_correction = assignment
                .grades_settings
                .as_ref()
                .ok_or(ExportError::MissingField {
                    entity: "assignment",
                    id: assignment.id,
                    field: "grades_settings",
                })?
                .guess_correction;

            let Some(fetched) = self
                .fetch_children::<Exercise>(Resource::Exercises, assignment.id, &mut report.stats)
                .await?
            else {
                continue;
            };

            let exercises = match ExerciseSet::from_fetched(fetched) {
                ExerciseSet::Empty => {
                    debug!(assignment_id = assignment.id, "Assignment has no exercises");
                    report.stats.empty_assignments += 1;
                    continue;
                }
                ExerciseSet::Exercises(exercises) => exercises,
            };
            report.stats.exercises += exercises.len() as u64;

            for exercise in &exercises {
                let questions: Vec<Question> = self
                    .fetch_children(Resource::Questions, exercise.id, &mut report.stats)
                    .await?
                    .unwrap_or_default();
                report.stats.questions += questions.len() as u64;

                report.rows.extend(questions.iter().map(|question| {
                    QuestionRow::new(course, assignment, guess_correction, exercise, question)
                }));
            }
        }

        Ok(report)
    }

    /// Root level: a failure keeps the courses received so far
    async fn fetch_courses(&self, stats: &mut ExportStats) -> Result<Vec<Course>, ExportError> {
        let fetched = self
            .paginator
            .fetch_all::<Course>(Resource::Courses, self.school_id)
            .await?;
        if !fetched.is_complete() {
            stats.failed_fetches += 1;
            warn!(
                "Course list incomplete; continuing with {} courses",
                fetched.items.len()
            );
        }
        Ok(fetched.into_partial())
    }

    /// Child levels: a failure discards the partial list (`None`)
    async fn fetch_children<T>(
        &self,
        resource: Resource,
        parent_id: u64,
        stats: &mut ExportStats,
    ) -> Result<Option<Vec<T>>, ExportError>
    where
        T: DeserializeOwned,
    {
        let fetched = self.paginator.fetch_all::<T>(resource, parent_id).await?;
        if fetched.is_complete() {
            Ok(Some(fetched.items))
        } else {
            stats.failed_fetches += 1;
            Ok(None)
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|shutdown| shutdown.is_shutdown_requested())
    }
}

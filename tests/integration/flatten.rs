//! Hierarchy walk and flattening against the scripted API

use assessment_exporter::fetcher::FetcherError;
use assessment_exporter::shutdown::ShutdownCoordinator;
use assessment_exporter::{AssessmentExporter, ExportError, QuestionRow};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

use crate::support::{assignment, config, courses, exercise, question, FakeApi, Reply};

fn exporter(api: &Arc<FakeApi>, page_limit: usize) -> AssessmentExporter {
    AssessmentExporter::new(api.clone(), &config(page_limit))
}

fn dec(value: &str) -> Option<Decimal> {
    Some(Decimal::from_str(value).unwrap())
}

/// Two courses, one exam each, one exercise each, two questions each
fn two_course_school(api: &FakeApi) {
    api.page("/schools/12/courses", 1, courses(1, 2));
    api.page(
        "/courses/1/assignments",
        1,
        json!([assignment(10, "Midterm", true)]),
    );
    api.page(
        "/courses/2/assignments",
        1,
        json!([assignment(20, "Final", false)]),
    );
    api.page("/assignments/10/exercises", 1, json!([exercise(100, "Block A")]));
    api.page("/assignments/20/exercises", 1, json!([exercise(200, "Block B")]));
    api.page(
        "/exercises/100/questions",
        1,
        json!([
            question("multiple_choice", 2.0, 0.25),
            question("open", 4.0, 0.0)
        ]),
    );
    api.page(
        "/exercises/200/questions",
        1,
        json!([
            question("multiple_choice", 1.0, 0.5),
            question("open", 3.0, 0.0)
        ]),
    );
}

#[tokio::test]
async fn test_one_row_per_question_in_hierarchy_order() {
    let api = Arc::new(FakeApi::new());
    two_course_school(&api);

    let report = exporter(&api, 100).collect().await.unwrap();

    assert_eq!(report.rows.len(), 4);
    assert_eq!(
        report.rows[0],
        QuestionRow {
            course_name: Some("Course 1".to_string()),
            course_code: Some("C1".to_string()),
            exam_name: Some("Midterm".to_string()),
            guess_correction: Some(true),
            exercise_name: Some("Block A".to_string()),
            question_type: Some("multiple_choice".to_string()),
            question_points: dec("2"),
            question_guess_score: dec("0.25"),
        }
    );

    let order: Vec<(&str, &str)> = report
        .rows
        .iter()
        .map(|r| {
            (
                r.course_code.as_deref().unwrap(),
                r.question_type.as_deref().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ("C1", "multiple_choice"),
            ("C1", "open"),
            ("C2", "multiple_choice"),
            ("C2", "open"),
        ]
    );
    assert_eq!(report.rows[3].guess_correction, Some(false));

    let stats = &report.stats;
    assert_eq!(stats.courses, 2);
    assert_eq!(stats.assignments, 2);
    assert_eq!(stats.exercises, 2);
    assert_eq!(stats.questions, 4);
    assert_eq!(stats.failed_fetches, 0);
    assert!(!stats.cancelled);
}

#[tokio::test]
async fn test_assignment_without_exercises_yields_no_rows() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 1));
    api.page(
        "/courses/1/assignments",
        1,
        json!([assignment(10, "Draft", false)]),
    );

    let report = exporter(&api, 100).collect().await.unwrap();

    assert!(report.rows.is_empty());
    assert_eq!(report.stats.empty_assignments, 1);
    assert!(api
        .requests()
        .iter()
        .all(|r| !r.path.starts_with("/exercises/")));
}

#[tokio::test]
async fn test_placeholder_exercise_means_empty_assignment() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 1));
    api.page(
        "/courses/1/assignments",
        1,
        json!([assignment(10, "Draft", false), assignment(11, "Quiz", true)]),
    );
    api.page("/assignments/10/exercises", 1, json!([exercise(0, "")]));
    api.page("/assignments/11/exercises", 1, json!([exercise(110, "Only")]));
    api.page(
        "/exercises/110/questions",
        1,
        json!([question("open", 1.0, 0.0)]),
    );

    let report = exporter(&api, 100).collect().await.unwrap();

    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].exam_name.as_deref(), Some("Quiz"));
    assert_eq!(report.stats.empty_assignments, 1);
    assert!(api.requests_for("/exercises/0/questions").is_empty());
}

#[tokio::test]
async fn test_failed_exercise_fetch_only_skips_that_assignment() {
    let api = Arc::new(FakeApi::new());
    // Queued ahead of the scripted success for the same page
    api.reply(
        "/assignments/10/exercises",
        1,
        Reply::Status(503, Vec::new()),
    );
    two_course_school(&api);

    let report = exporter(&api, 100).collect().await.unwrap();

    assert_eq!(report.rows.len(), 2);
    assert!(report
        .rows
        .iter()
        .all(|r| r.course_code.as_deref() == Some("C2")));
    assert_eq!(report.stats.failed_fetches, 1);
}

#[tokio::test]
async fn test_failed_question_fetch_drops_partial_questions() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 1));
    api.page(
        "/courses/1/assignments",
        1,
        json!([assignment(10, "Midterm", true)]),
    );
    api.page("/assignments/10/exercises", 1, json!([exercise(100, "Block A")]));
    api.page(
        "/exercises/100/questions",
        1,
        json!([question("open", 1.0, 0.0), question("open", 2.0, 0.0)]),
    );
    api.reply("/exercises/100/questions", 2, Reply::NetworkError);

    let report = exporter(&api, 2).collect().await.unwrap();

    assert!(report.rows.is_empty());
    assert_eq!(report.stats.failed_fetches, 1);
}

#[tokio::test]
async fn test_missing_grades_settings_is_an_error() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 1));
    api.page(
        "/courses/1/assignments",
        1,
        json!([{"id": 10, "name": "Legacy exam"}]),
    );

    let result = exporter(&api, 100).collect().await;

    match result {
        Err(ExportError::MissingField { entity, id, field }) => {
            assert_eq!(entity, "assignment");
            assert_eq!(id, 10);
            assert_eq!(field, "grades_settings");
        }
        other => panic!("expected missing field error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_null_guess_correction_leaves_cell_empty() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 1));
    api.page(
        "/courses/1/assignments",
        1,
        json!([{"id": 10, "name": "Exam", "grades_settings": {}}]),
    );
    api.page("/assignments/10/exercises", 1, json!([exercise(100, "Block A")]));
    api.page(
        "/exercises/100/questions",
        1,
        json!([{"id": 1, "category": "open"}]),
    );

    let report = exporter(&api, 100).collect().await.unwrap();

    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].guess_correction, None);
    assert_eq!(report.rows[0].question_points, None);
    assert_eq!(report.rows[0].question_guess_score, None);
}

#[tokio::test]
async fn test_partial_course_list_is_kept() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 2));
    api.reply("/schools/12/courses", 2, Reply::Status(502, Vec::new()));

    let report = exporter(&api, 2).collect().await.unwrap();

    assert_eq!(report.stats.courses, 2);
    assert_eq!(report.stats.failed_fetches, 1);
    assert_eq!(api.requests_for("/courses/1/assignments"), vec![1]);
    assert_eq!(api.requests_for("/courses/2/assignments"), vec![1]);
}

#[tokio::test]
async fn test_questions_span_several_pages() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 1));
    api.page(
        "/courses/1/assignments",
        1,
        json!([assignment(10, "Midterm", true)]),
    );
    api.page("/assignments/10/exercises", 1, json!([exercise(100, "Block A")]));
    api.page(
        "/exercises/100/questions",
        1,
        json!([question("open", 1.0, 0.0), question("open", 2.0, 0.0)]),
    );
    api.page(
        "/exercises/100/questions",
        2,
        json!([question("open", 3.0, 0.0)]),
    );

    let report = exporter(&api, 2).collect().await.unwrap();

    let points: Vec<Option<Decimal>> = report.rows.iter().map(|r| r.question_points).collect();
    assert_eq!(points, vec![dec("1"), dec("2"), dec("3")]);
    assert_eq!(api.requests_for("/exercises/100/questions"), vec![1, 2]);
}

#[tokio::test]
async fn test_concurrent_courses_keep_row_order() {
    let sequential_api = Arc::new(FakeApi::new());
    two_course_school(&sequential_api);
    let sequential = exporter(&sequential_api, 100).collect().await.unwrap();

    let concurrent_api = Arc::new(FakeApi::new());
    two_course_school(&concurrent_api);
    let concurrent = exporter(&concurrent_api, 100)
        .with_concurrency(2)
        .collect()
        .await
        .unwrap();

    assert_eq!(sequential.rows, concurrent.rows);
    assert_eq!(sequential.stats, concurrent.stats);
}

#[tokio::test]
async fn test_shutdown_before_start_collects_nothing() {
    let api = Arc::new(FakeApi::new());
    two_course_school(&api);

    let shutdown = ShutdownCoordinator::shared();
    assert!(shutdown.request_shutdown());

    let report = exporter(&api, 100)
        .with_shutdown(shutdown)
        .collect()
        .await
        .unwrap();

    assert!(report.rows.is_empty());
    assert!(report.stats.cancelled);
    assert_eq!(report.stats.courses, 2);
    assert!(api.requests_for("/courses/1/assignments").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_throttle_exhaustion_aborts_export() {
    let api = Arc::new(FakeApi::new());
    for _ in 0..2 {
        api.reply(
            "/courses/2/assignments",
            1,
            Reply::Status(429, vec![("ratelimit-reset", "1".to_string())]),
        );
    }
    two_course_school(&api);

    let result = AssessmentExporter::new(
        api.clone(),
        &config(100).with_max_throttle_retries(Some(1)),
    )
    .collect()
    .await;

    assert!(matches!(
        result,
        Err(ExportError::Fetcher(
            FetcherError::ThrottleRetriesExhausted { attempts: 2, .. }
        ))
    ));
}

#[tokio::test]
async fn test_mistyped_question_field_keeps_page() {
    let api = Arc::new(FakeApi::new());
    api.page("/schools/12/courses", 1, courses(1, 1));
    api.page(
        "/courses/1/assignments",
        1,
        json!([assignment(10, "Midterm", true)]),
    );
    api.page("/assignments/10/exercises", 1, json!([exercise(100, "Block A")]));
    api.page(
        "/exercises/100/questions",
        1,
        json!([
            question("multiple_choice", 2.0, 0.25),
            question("open", 4.0, 0.0),
            {"id": 3, "category": "open", "points": true, "guess_score": "0"}
        ]),
    );

    let report = exporter(&api, 100).collect().await.unwrap();

    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.stats.failed_fetches, 0);
    assert_eq!(report.rows[2].question_points, None);
    assert_eq!(report.rows[2].question_guess_score, dec("0"));
}

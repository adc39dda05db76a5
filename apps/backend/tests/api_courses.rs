//! Course authoring and enrollment API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable before running.

mod common;

use axum::http::StatusCode;

use common::fixtures;
use common::TestContext;

/// Test instructors can create a course and read its outline back.
#[tokio::test]
#[ignore = "requires database"]
async fn test_create_and_get_course() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let (_, instructor) = ctx.register_instructor(&server).await;

    let course = ctx.create_course(&server, &instructor, &[3, 2]).await;
    assert_eq!(course.modules.len(), 2);
    assert_eq!(course.modules[0].lessons.len(), 3);
    assert_eq!(course.modules[1].position, 2);
    assert_eq!(
        course.modules[0].lessons[0].video_url.as_deref(),
        Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
    );

    let response = server
        .get(&format!("/api/courses/{}", course.id))
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&instructor),
        )
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["modules"][0]["lessons"].as_array().unwrap().len(), 3);
    assert_eq!(body["modules"][1]["lessons"][1]["kind"], "text");

    // Cleanup
    ctx.cleanup().await;
}

/// Test learners cannot author courses.
#[tokio::test]
#[ignore = "requires database"]
async fn test_learner_cannot_create_course() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let (_, token) = ctx.register_learner(&server).await;

    let response = server
        .post("/api/courses")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .json(&fixtures::course_request(&[1]))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    // Cleanup
    ctx.cleanup().await;
}

/// Test enrolling twice returns the same enrollment.
#[tokio::test]
#[ignore = "requires database"]
async fn test_enroll_is_idempotent() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let (_, instructor) = ctx.register_instructor(&server).await;
    let (learner_id, token) = ctx.register_learner(&server).await;
    let course = ctx.create_course(&server, &instructor, &[1]).await;

    let first = ctx.enroll(&server, &token, course.id).await;
    let second = ctx.enroll(&server, &token, course.id).await;

    assert_eq!(first.id, second.id);
    assert_eq!(first.learner_id, learner_id);
    assert_eq!(first.progress_percentage, 0.0);

    // Cleanup
    ctx.cleanup().await;
}

/// Test enrolling in an unknown course is not found.
#[tokio::test]
#[ignore = "requires database"]
async fn test_enroll_unknown_course() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let (_, token) = ctx.register_learner(&server).await;

    let response = server
        .post("/api/enrollments")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .json(&serde_json::json!({ "course_id": uuid::Uuid::new_v4() }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    // Cleanup
    ctx.cleanup().await;
}

//! Learner registration and authentication API tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable before running.

mod common;

use axum::http::StatusCode;

use common::fixtures;
use common::TestContext;

/// Test registration returns a token that authenticates.
#[tokio::test]
#[ignore = "requires database"]
async fn test_register_and_fetch_profile() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let (learner_id, token) = ctx.register_learner(&server).await;

    let response = server
        .get("/api/learners/me")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], learner_id.to_string());
    assert_eq!(body["role"], "learner");

    // Cleanup
    ctx.cleanup().await;
}

/// Test duplicate email is a conflict.
#[tokio::test]
#[ignore = "requires database"]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let email = fixtures::unique_email("dup");

    let first = server
        .post("/api/learners/register")
        .json(&fixtures::register_request(&email, None))
        .await;
    first.assert_status_ok();
    let first: serde_json::Value = first.json();

    let second = server
        .post("/api/learners/register")
        .json(&fixtures::register_request(&email.to_uppercase(), None))
        .await;
    second.assert_status(StatusCode::CONFLICT);

    // Cleanup
    let id = uuid::Uuid::parse_str(first["learner_id"].as_str().unwrap()).unwrap();
    let _ = sqlx::query("DELETE FROM learners WHERE id = $1")
        .bind(id)
        .execute(ctx.state.db.pool())
        .await;
}

/// Test instructor registration needs the signup code.
#[tokio::test]
#[ignore = "requires database"]
async fn test_register_instructor_requires_code() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/api/learners/register")
        .json(&fixtures::register_request(&fixtures::unique_email("fake"), Some("wrong")))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

/// Test protected endpoints reject missing and forged tokens.
#[tokio::test]
#[ignore = "requires database"]
async fn test_requires_valid_token() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    server
        .get("/api/certificates")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/certificates")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value("forged.token.value"),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

/// Test token refresh returns a usable token.
#[tokio::test]
#[ignore = "requires database"]
async fn test_refresh_token() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let (_, token) = ctx.register_learner(&server).await;

    let response = server
        .post("/api/learners/me/token")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(&token),
        )
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let fresh = body["token"].as_str().unwrap();

    server
        .get("/api/learners/me")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(fresh),
        )
        .await
        .assert_status_ok();

    // Cleanup
    ctx.cleanup().await;
}

/// Test health check is public.
#[tokio::test]
#[ignore = "requires database"]
async fn test_health_check() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

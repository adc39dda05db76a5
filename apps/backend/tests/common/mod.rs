//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext for setting up test environment with database
//! - Helpers for registering learners and instructors
//! - Course and enrollment builders
//!
//! # Requirements
//! Integration tests require:
//! - PostgreSQL database (set DATABASE_URL env var)
//! - Optionally S3-compatible storage for document tests (set S3_* env vars)

pub mod fixtures;

use axum::Router;
use axum_test::TestServer;
use uuid::Uuid;

use course_backend::config::AppConfig;
use course_backend::db::Database;
use course_backend::models::{CourseOutline, EnrollmentView, RegisterResponse};
use course_backend::{router, AppState};

pub const INSTRUCTOR_CODE: &str = "test-instructor-code";

/// Test context containing the application state and router.
///
/// Requires DATABASE_URL environment variable to be set. Storage and token
/// settings fall back to local test values when not provided.
pub struct TestContext {
    pub state: AppState,
    app: Router,
    learners: std::sync::Mutex<Vec<Uuid>>,
}

impl TestContext {
    /// Create a new test context.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let config = AppConfig::from_lookup(|key| {
            std::env::var(key).ok().or_else(|| {
                let fallback = match key {
                    "JWT_SECRET" => "integration-test-secret",
                    "S3_ACCESS_KEY" => "test-key",
                    "S3_SECRET_KEY" => "test-secret",
                    "S3_ENDPOINT" => "http://localhost:9000",
                    "INSTRUCTOR_SIGNUP_CODE" => INSTRUCTOR_CODE,
                    _ => return None,
                };
                Some(fallback.to_string())
            })
        })
        .expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&config.database_url, config.db_max_connections)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let state = AppState::new(db, config)
            .await
            .expect("Failed to build application state");

        let app = router(state.clone());

        Self {
            state,
            app,
            learners: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Register a learner with a unique email and return (id, token).
    pub async fn register_learner(&self, server: &TestServer) -> (Uuid, String) {
        self.register(server, fixtures::register_request(&fixtures::unique_email("learner"), None))
            .await
    }

    /// Register an instructor with a unique email and return (id, token).
    pub async fn register_instructor(&self, server: &TestServer) -> (Uuid, String) {
        self.register(
            server,
            fixtures::register_request(&fixtures::unique_email("instructor"), Some(INSTRUCTOR_CODE)),
        )
        .await
    }

    async fn register(&self, server: &TestServer, body: serde_json::Value) -> (Uuid, String) {
        let response = server.post("/api/learners/register").json(&body).await;
        response.assert_status_ok();
        let body: RegisterResponse = response.json();
        self.learners.lock().unwrap().push(body.learner_id);
        (body.learner_id, body.token)
    }

    /// Create a course with the given lesson count per module.
    pub async fn create_course(&self, server: &TestServer, instructor_token: &str, lessons: &[usize]) -> CourseOutline {
        let response = server
            .post("/api/courses")
            .add_header(
                axum::http::header::AUTHORIZATION,
                Self::auth_header_value(instructor_token),
            )
            .json(&fixtures::course_request(lessons))
            .await;
        response.assert_status_ok();
        response.json()
    }

    pub async fn enroll(&self, server: &TestServer, token: &str, course_id: Uuid) -> EnrollmentView {
        let response = server
            .post("/api/enrollments")
            .add_header(
                axum::http::header::AUTHORIZATION,
                Self::auth_header_value(token),
            )
            .json(&serde_json::json!({ "course_id": course_id }))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Number of certificate rows for a (module, learner) pair.
    pub async fn certificate_count(&self, module_id: Uuid, learner_id: Uuid) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM module_certificates WHERE module_id = $1 AND learner_id = $2",
        )
        .bind(module_id)
        .bind(learner_id)
        .fetch_one(self.state.db.pool())
        .await
        .expect("Failed to count certificates")
    }

    /// Remove every learner registered through this context, with their courses.
    ///
    /// Call this after tests to remove test data.
    pub async fn cleanup(&self) {
        let ids: Vec<Uuid> = self.learners.lock().unwrap().drain(..).collect();

        // Courses do not cascade from their author, delete them first
        let _ = sqlx::query("DELETE FROM courses WHERE created_by = ANY($1)")
            .bind(&ids)
            .execute(self.state.db.pool())
            .await;

        let _ = sqlx::query("DELETE FROM learners WHERE id = ANY($1)")
            .bind(&ids)
            .execute(self.state.db.pool())
            .await;
    }
}

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use course_core::{get_policy, GradePolicy};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::db::Database;
use crate::services::storage::StorageService;
use crate::services::tokens::TokenService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<StorageService>,
    pub tokens: Arc<TokenService>,
    pub grade_policy: Arc<dyn GradePolicy>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Assemble state from an existing database and config.
    pub async fn new(db: Database, config: AppConfig) -> anyhow::Result<Self> {
        let storage = StorageService::new(&config.storage).await?;

        let grade_policy: Arc<dyn GradePolicy> = get_policy(&config.grade_policy)
            .map(Arc::from)
            .ok_or_else(|| anyhow::anyhow!("Unknown GRADE_POLICY: {}", config.grade_policy))?;

        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiry_hours);

        Ok(Self {
            db: Arc::new(db),
            storage: Arc::new(storage),
            tokens: Arc::new(tokens),
            grade_policy,
            config: Arc::new(config),
        })
    }
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    let protected_routes = Router::new()
        // Learner routes
        .route("/api/learners/me", get(routes::learners::me))
        .route("/api/learners/me/token", post(routes::learners::refresh_token))
        // Course routes
        .route("/api/courses", post(routes::courses::create))
        .route("/api/courses/{id}", get(routes::courses::get))
        // Enrollment and progress routes
        .route("/api/enrollments", post(routes::enrollments::enroll))
        .route(
            "/api/course-progress/enrollment/{id}",
            get(routes::enrollments::course_progress),
        )
        .route("/api/lesson-progress", post(routes::progress::record))
        // Certificate routes
        .route("/api/module-certificate", post(routes::certificates::issue))
        .route("/api/certificates", get(routes::certificates::list))
        .route("/api/certificates/{id}/file", get(routes::certificates::file))
        // File routes
        .route(
            "/api/files/{bucket}",
            post(routes::files::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/files/{bucket}/{*key}", delete(routes::files::delete))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/learners/register", post(routes::learners::register))
        .route(
            "/api/certificates/verify/{code}",
            get(routes::certificates::verify),
        )
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url, config.db_max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    tracing::info!("Initializing object storage...");
    let state = AppState::new(db, config).await?;
    tracing::info!("Certificate grade policy: {}", state.grade_policy.name());

    let addr = state.config.bind_addr();
    let app = router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

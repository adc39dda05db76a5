//! Lesson progress endpoint

use axum::{extract::State, Extension, Json};

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedLearner;
use crate::services::progress;
use crate::AppState;

/// POST /api/lesson-progress
pub async fn record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Json(payload): Json<LessonProgressRequest>,
) -> Result<Json<LessonProgressResponse>> {
    let response = progress::record_progress(&state, auth.learner_id, &payload).await?;
    Ok(Json(response))
}

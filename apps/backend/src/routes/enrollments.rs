//! Enrollment endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedLearner;
use crate::services::progress;
use crate::AppState;

/// POST /api/enrollments
/// Enrolling twice returns the existing enrollment
pub async fn enroll(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Json(payload): Json<EnrollRequest>,
) -> Result<Json<EnrollmentView>> {
    let enrollment = state
        .db
        .create_enrollment(auth.learner_id, payload.course_id)
        .await?;
    Ok(Json(enrollment.to_view()))
}

/// GET /api/course-progress/enrollment/:id
pub async fn course_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Path(enrollment_id): Path<Uuid>,
) -> Result<Json<CourseProgressResponse>> {
    let enrollment =
        progress::authorized_enrollment(&state, auth.learner_id, auth.role, enrollment_id).await?;
    let response = progress::course_progress(&state, &enrollment).await?;
    Ok(Json(response))
}

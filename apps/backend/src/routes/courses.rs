//! Course authoring endpoints

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use course_core::{embed_url, extract_youtube_id, is_youtube_url, CoreError};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedLearner;
use crate::AppState;

/// POST /api/courses
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedLearner>,
    Json(mut payload): Json<CreateCourseRequest>,
) -> Result<Json<CourseOutline>> {
    auth.require_instructor()?;
    normalize_course(&mut payload)?;

    let outline = state.db.create_course(auth.learner_id, &payload).await?;
    Ok(Json(outline))
}

/// GET /api/courses/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthenticatedLearner>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseOutline>> {
    let outline = state
        .db
        .get_course_outline(course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Course {}", course_id)))?;
    Ok(Json(outline))
}

/// Trim titles and canonicalize YouTube links to embed URLs.
fn normalize_course(course: &mut CreateCourseRequest) -> Result<()> {
    course.title = course.title.trim().to_string();
    if course.title.is_empty() {
        return Err(ApiError::Validation("Course title is required".to_string()));
    }

    for module in &mut course.modules {
        module.title = module.title.trim().to_string();
        if module.title.is_empty() {
            return Err(ApiError::Validation("Module title is required".to_string()));
        }

        for lesson in &mut module.lessons {
            lesson.title = lesson.title.trim().to_string();
            if lesson.title.is_empty() {
                return Err(ApiError::Validation("Lesson title is required".to_string()));
            }
            if lesson.duration_seconds.is_some_and(|d| d < 0) {
                return Err(ApiError::Validation("Lesson duration must not be negative".to_string()));
            }
            if let Some(url) = lesson.video_url.take() {
                lesson.video_url = Some(normalize_video_url(&url)?);
            }
        }
    }

    Ok(())
}

/// YouTube links become embed URLs; anything else (e.g. an uploaded video
/// key) is kept as given.
fn normalize_video_url(url: &str) -> Result<String> {
    let url = url.trim();
    if is_youtube_url(url) {
        let id = extract_youtube_id(url).ok_or_else(|| CoreError::InvalidVideoUrl(url.to_string()))?;
        Ok(embed_url(&id))
    } else {
        Ok(url.to_string())
    }
}

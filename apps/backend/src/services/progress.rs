//! Lesson progress recording and certificate issuance.

use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::certificate;
use crate::AppState;

/// Load an enrollment the caller is allowed to act on.
///
/// Learners may only touch their own enrollments; instructors may read any.
pub async fn authorized_enrollment(
    state: &AppState,
    learner_id: Uuid,
    role: Role,
    enrollment_id: Uuid,
) -> Result<DbEnrollment> {
    let enrollment = state
        .db
        .get_enrollment(enrollment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Enrollment {}", enrollment_id)))?;

    if enrollment.learner_id != learner_id && role != Role::Instructor {
        return Err(ApiError::Forbidden("Enrollment belongs to another learner".to_string()));
    }

    Ok(enrollment)
}

/// Load an enrollment for a write; only its learner may change it.
pub async fn owned_enrollment(state: &AppState, learner_id: Uuid, enrollment_id: Uuid) -> Result<DbEnrollment> {
    let enrollment = state
        .db
        .get_enrollment(enrollment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Enrollment {}", enrollment_id)))?;

    if enrollment.learner_id != learner_id {
        return Err(ApiError::Forbidden("Enrollment belongs to another learner".to_string()));
    }

    Ok(enrollment)
}

/// Record a progress report and, when it completes a lesson, try to issue
/// the module certificate.
pub async fn record_progress(
    state: &AppState,
    learner_id: Uuid,
    request: &LessonProgressRequest,
) -> Result<LessonProgressResponse> {
    request.update.validate()?;

    let enrollment = owned_enrollment(state, learner_id, request.enrollment_id).await?;

    let lesson = state
        .db
        .get_lesson_context(request.lesson_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Lesson {}", request.lesson_id)))?;
    if lesson.course_id != enrollment.course_id {
        return Err(ApiError::BadRequest(format!(
            "Lesson {} is not part of the enrolled course",
            request.lesson_id
        )));
    }

    let progress = state
        .db
        .upsert_lesson_progress(enrollment.id, lesson.lesson_id, &request.update)
        .await?;
    let enrollment = state.db.refresh_enrollment_progress(enrollment.id).await?;

    let certificate = if progress.completed {
        match issue_and_publish(state, enrollment.id, lesson.module_id).await? {
            IssueOutcome::Issued(c) => Some(c.to_view()),
            IssueOutcome::AlreadyIssued(_) | IssueOutcome::Incomplete(_) => None,
        }
    } else {
        None
    };

    Ok(LessonProgressResponse {
        progress: progress.to_view(),
        enrollment: enrollment.to_view(),
        certificate,
    })
}

/// Run issuance for a module and publish the document of a new certificate.
///
/// A failed upload does not undo the issuance; the document is rebuilt on
/// the next download request.
pub async fn issue_and_publish(state: &AppState, enrollment_id: Uuid, module_id: Uuid) -> Result<IssueOutcome> {
    let mut outcome = state
        .db
        .issue_module_certificate(enrollment_id, module_id, state.grade_policy.as_ref())
        .await?;

    if let IssueOutcome::Issued(cert) = &mut outcome {
        match certificate::publish(&state.db, &state.storage, cert.id).await {
            Ok(key) => cert.file_key = Some(key),
            Err(e) => tracing::warn!("Certificate {} issued without document: {}", cert.id, e),
        }
    }

    Ok(outcome)
}

/// Build the full progress view of an enrollment.
pub async fn course_progress(state: &AppState, enrollment: &DbEnrollment) -> Result<CourseProgressResponse> {
    let completions = state.db.get_module_completions(enrollment).await?;
    let certificates = state.db.get_certificates_for_enrollment(enrollment.id).await?;
    let lessons = state.db.get_enrollment_progress(enrollment.id).await?;

    let modules = completions
        .into_iter()
        .map(|(module, completion)| ModuleProgressView {
            certificate: certificates
                .iter()
                .find(|c| c.module_id == module.id)
                .map(DbCertificate::to_view),
            module_id: module.id,
            title: module.title,
            position: module.position,
            completion,
        })
        .collect();

    Ok(CourseProgressResponse {
        enrollment: enrollment.to_view(),
        modules,
        lessons: lessons.iter().map(DbLessonProgress::to_view).collect(),
    })
}

//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Re-export shared types from course-core
pub use course_core::types::{BucketKind, EnrollmentStatus, LessonKind, ProgressUpdate, Role};
pub use course_core::ModuleCompletion;

// === Database Entity Types ===

/// Registered learner or instructor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Learner {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl Learner {
    pub fn role(&self) -> Role {
        Role::from_str(&self.role).unwrap_or_default()
    }
}

/// Course stored in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCourse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbModule {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbLesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub kind: String,
    pub position: i32,
    pub video_url: Option<String>,
    pub duration_seconds: Option<i32>,
}

impl DbLesson {
    pub fn to_view(&self) -> LessonView {
        LessonView {
            id: self.id,
            title: self.title.clone(),
            kind: LessonKind::from_str(&self.kind).unwrap_or(LessonKind::Text),
            position: self.position,
            video_url: self.video_url.clone(),
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Lesson joined with the module and course that own it
#[derive(Debug, Clone, FromRow)]
pub struct LessonContext {
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbEnrollment {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub course_id: Uuid,
    pub progress_percentage: f64,
    pub status: String,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DbEnrollment {
    pub fn status(&self) -> EnrollmentStatus {
        EnrollmentStatus::from_str(&self.status).unwrap_or_default()
    }

    pub fn to_view(&self) -> EnrollmentView {
        EnrollmentView {
            id: self.id,
            learner_id: self.learner_id,
            course_id: self.course_id,
            progress_percentage: self.progress_percentage,
            status: self.status(),
            enrolled_at: self.enrolled_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbLessonProgress {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: i64,
    pub video_progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbLessonProgress {
    pub fn to_view(&self) -> LessonProgressView {
        LessonProgressView {
            lesson_id: self.lesson_id,
            completed: self.completed,
            completed_at: self.completed_at,
            time_spent_seconds: self.time_spent_seconds,
            video_progress: self.video_progress,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCertificate {
    pub id: Uuid,
    pub module_id: Uuid,
    pub learner_id: Uuid,
    pub enrollment_id: Uuid,
    pub verification_code: String,
    pub grade: f64,
    pub file_key: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl DbCertificate {
    pub fn to_view(&self) -> CertificateView {
        CertificateView {
            id: self.id,
            module_id: self.module_id,
            learner_id: self.learner_id,
            enrollment_id: self.enrollment_id,
            verification_code: self.verification_code.clone(),
            grade: self.grade,
            has_file: self.file_key.is_some(),
            issued_at: self.issued_at,
        }
    }
}

/// Certificate joined with the names printed on the document
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificateDetails {
    pub id: Uuid,
    pub module_id: Uuid,
    pub learner_id: Uuid,
    pub verification_code: String,
    pub grade: f64,
    pub file_key: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub module_title: String,
    pub course_title: String,
    pub learner_name: Option<String>,
    pub learner_email: String,
}

/// Result of an issuance attempt
#[derive(Debug, Clone)]
pub enum IssueOutcome {
    Issued(DbCertificate),
    AlreadyIssued(DbCertificate),
    Incomplete(ModuleCompletion),
}

// === API Types ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    pub instructor_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub learner_id: Uuid,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLesson {
    pub title: String,
    pub kind: LessonKind,
    pub video_url: Option<String>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewModule {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<NewLesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub modules: Vec<NewModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonView {
    pub id: Uuid,
    pub title: String,
    pub kind: LessonKind,
    pub position: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub lessons: Vec<LessonView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutline {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub modules: Vec<ModuleOutline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub course_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentView {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub course_id: Uuid,
    pub progress_percentage: f64,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgressRequest {
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    #[serde(flatten)]
    pub update: ProgressUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgressView {
    pub lesson_id: Uuid,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: i64,
    pub video_progress: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgressResponse {
    pub progress: LessonProgressView,
    pub enrollment: EnrollmentView,
    /// Present only when this update issued a new certificate
    pub certificate: Option<CertificateView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleProgressView {
    pub module_id: Uuid,
    pub title: String,
    pub position: i32,
    pub completion: ModuleCompletion,
    pub certificate: Option<CertificateView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseProgressResponse {
    pub enrollment: EnrollmentView,
    pub modules: Vec<ModuleProgressView>,
    pub lessons: Vec<LessonProgressView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCertificateRequest {
    pub enrollment_id: Uuid,
    pub module_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Issued,
    AlreadyIssued,
    Incomplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCertificateResponse {
    pub status: IssueStatus,
    pub certificate: Option<CertificateView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<ModuleCompletion>,
}

impl From<&IssueOutcome> for ModuleCertificateResponse {
    fn from(outcome: &IssueOutcome) -> Self {
        match outcome {
            IssueOutcome::Issued(c) => Self {
                status: IssueStatus::Issued,
                certificate: Some(c.to_view()),
                completion: None,
            },
            IssueOutcome::AlreadyIssued(c) => Self {
                status: IssueStatus::AlreadyIssued,
                certificate: Some(c.to_view()),
                completion: None,
            },
            IssueOutcome::Incomplete(completion) => Self {
                status: IssueStatus::Incomplete,
                certificate: None,
                completion: Some(completion.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateView {
    pub id: Uuid,
    pub module_id: Uuid,
    pub learner_id: Uuid,
    pub enrollment_id: Uuid,
    pub verification_code: String,
    pub grade: f64,
    pub has_file: bool,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateListResponse {
    pub certificates: Vec<CertificateView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCertificateResponse {
    pub verification_code: String,
    pub learner_name: Option<String>,
    pub course_title: String,
    pub module_title: String,
    pub grade: f64,
    pub issued_at: DateTime<Utc>,
}

impl From<&CertificateDetails> for VerifyCertificateResponse {
    fn from(d: &CertificateDetails) -> Self {
        Self {
            verification_code: d.verification_code.clone(),
            learner_name: d.learner_name.clone(),
            course_title: d.course_title.clone(),
            module_title: d.module_title.clone(),
            grade: d.grade,
            issued_at: d.issued_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub bucket: BucketKind,
    pub key: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn progress_request_flattens_update_fields() {
        let body = serde_json::json!({
            "enrollment_id": Uuid::nil(),
            "lesson_id": Uuid::nil(),
            "completed": true,
            "video_progress": 0.75
        });
        let request: LessonProgressRequest = serde_json::from_value(body).unwrap();
        assert!(request.update.completed);
        assert_eq!(request.update.time_spent_seconds, 0);
        assert_eq!(request.update.video_progress, Some(0.75));
    }

    #[test]
    fn incomplete_outcome_reports_completion() {
        let outcome = IssueOutcome::Incomplete(ModuleCompletion::Empty);
        let response = ModuleCertificateResponse::from(&outcome);
        assert_eq!(response.status, IssueStatus::Incomplete);
        assert!(response.certificate.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "incomplete");
        assert_eq!(json["completion"]["state"], "empty");
    }

    #[test]
    fn unknown_enrollment_status_falls_back_to_enrolled() {
        let enrollment = DbEnrollment {
            id: Uuid::new_v4(),
            learner_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            progress_percentage: 0.0,
            status: "paused".to_string(),
            enrolled_at: Utc::now(),
            completed_at: None,
            updated_at: Utc::now(),
        };
        assert_eq!(enrollment.status(), EnrollmentStatus::Enrolled);
    }
}

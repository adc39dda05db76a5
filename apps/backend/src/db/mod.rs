//! PostgreSQL database operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use course_core::{course_progress, evaluate_module, GradePolicy, LessonScore};
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::certificate::verification_code;

const ENROLLMENT_COLUMNS: &str =
    "id, learner_id, course_id, progress_percentage, status, enrolled_at, completed_at, updated_at";

const CERTIFICATE_COLUMNS: &str =
    "id, module_id, learner_id, enrollment_id, verification_code, grade, file_key, issued_at";

const CERTIFICATE_DETAILS_SELECT: &str = r#"
    SELECT c.id, c.module_id, c.learner_id, c.verification_code, c.grade, c.file_key,
           c.issued_at, m.title AS module_title, co.title AS course_title,
           le.name AS learner_name, le.email AS learner_email
    FROM module_certificates c
    JOIN course_modules m ON m.id = c.module_id
    JOIN courses co ON co.id = m.course_id
    JOIN learners le ON le.id = c.learner_id
"#;

const PROGRESS_COLUMNS: &str = "id, enrollment_id, lesson_id, completed, completed_at, \
     time_spent_seconds, video_progress, created_at, updated_at";

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Build a pool that only connects when first used
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === Learner Repository ===

    pub async fn create_learner(&self, email: &str, name: Option<&str>, role: Role) -> Result<Learner> {
        let result = sqlx::query_as::<_, Learner>(
            r#"
            INSERT INTO learners (email, name, role)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, role, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(learner) => Ok(learner),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(ApiError::Conflict(
                format!("Email {} is already registered", email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_learner(&self, learner_id: Uuid) -> Result<Option<Learner>> {
        let learner = sqlx::query_as::<_, Learner>(
            r#"
            SELECT id, email, name, role, created_at
            FROM learners
            WHERE id = $1
            "#,
        )
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(learner)
    }

    // === Course Repository ===

    /// Create a course with its modules and lessons in one transaction.
    /// Module and lesson positions follow request order, starting at 1.
    pub async fn create_course(&self, created_by: Uuid, request: &CreateCourseRequest) -> Result<CourseOutline> {
        let mut tx = self.pool.begin().await?;

        let course = sqlx::query_as::<_, DbCourse>(
            r#"
            INSERT INTO courses (title, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, created_by, created_at
            "#,
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut modules = Vec::with_capacity(request.modules.len());
        for (module_idx, new_module) in request.modules.iter().enumerate() {
            let module = sqlx::query_as::<_, DbModule>(
                r#"
                INSERT INTO course_modules (course_id, title, position)
                VALUES ($1, $2, $3)
                RETURNING id, course_id, title, position
                "#,
            )
            .bind(course.id)
            .bind(&new_module.title)
            .bind(module_idx as i32 + 1)
            .fetch_one(&mut *tx)
            .await?;

            let mut lessons = Vec::with_capacity(new_module.lessons.len());
            for (lesson_idx, new_lesson) in new_module.lessons.iter().enumerate() {
                let lesson = sqlx::query_as::<_, DbLesson>(
                    r#"
                    INSERT INTO lessons (module_id, title, kind, position, video_url, duration_seconds)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING id, module_id, title, kind, position, video_url, duration_seconds
                    "#,
                )
                .bind(module.id)
                .bind(&new_lesson.title)
                .bind(new_lesson.kind.as_str())
                .bind(lesson_idx as i32 + 1)
                .bind(&new_lesson.video_url)
                .bind(new_lesson.duration_seconds)
                .fetch_one(&mut *tx)
                .await?;
                lessons.push(lesson.to_view());
            }

            modules.push(ModuleOutline {
                id: module.id,
                title: module.title,
                position: module.position,
                lessons,
            });
        }

        tx.commit().await?;

        tracing::info!("Created course {} with {} modules", course.id, modules.len());

        Ok(CourseOutline {
            id: course.id,
            title: course.title,
            description: course.description,
            modules,
        })
    }

    pub async fn get_course_outline(&self, course_id: Uuid) -> Result<Option<CourseOutline>> {
        let course = sqlx::query_as::<_, DbCourse>(
            r#"
            SELECT id, title, description, created_by, created_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(course) = course else {
            return Ok(None);
        };

        let modules = self.get_course_modules(course_id).await?;
        let lessons = sqlx::query_as::<_, DbLesson>(
            r#"
            SELECT l.id, l.module_id, l.title, l.kind, l.position, l.video_url, l.duration_seconds
            FROM lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            ORDER BY m.position, l.position
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_module: HashMap<Uuid, Vec<LessonView>> = HashMap::new();
        for lesson in &lessons {
            by_module.entry(lesson.module_id).or_default().push(lesson.to_view());
        }

        let modules = modules
            .into_iter()
            .map(|m| ModuleOutline {
                lessons: by_module.remove(&m.id).unwrap_or_default(),
                id: m.id,
                title: m.title,
                position: m.position,
            })
            .collect();

        Ok(Some(CourseOutline {
            id: course.id,
            title: course.title,
            description: course.description,
            modules,
        }))
    }

    pub async fn get_course_modules(&self, course_id: Uuid) -> Result<Vec<DbModule>> {
        let modules = sqlx::query_as::<_, DbModule>(
            r#"
            SELECT id, course_id, title, position
            FROM course_modules
            WHERE course_id = $1
            ORDER BY position
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(modules)
    }

    /// Lesson with its owning module and course
    pub async fn get_lesson_context(&self, lesson_id: Uuid) -> Result<Option<LessonContext>> {
        let context = sqlx::query_as::<_, LessonContext>(
            r#"
            SELECT l.id AS lesson_id, l.module_id, m.course_id
            FROM lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(context)
    }

    // === Enrollment Repository ===

    /// Enroll a learner; returns the existing enrollment if already enrolled.
    pub async fn create_enrollment(&self, learner_id: Uuid, course_id: Uuid) -> Result<DbEnrollment> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(ApiError::NotFound(format!("Course {}", course_id)));
        }

        sqlx::query(
            r#"
            INSERT INTO enrollments (learner_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (learner_id, course_id) DO NOTHING
            "#,
        )
        .bind(learner_id)
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        let enrollment = sqlx::query_as::<_, DbEnrollment>(&format!(
            "SELECT {} FROM enrollments WHERE learner_id = $1 AND course_id = $2",
            ENROLLMENT_COLUMNS
        ))
        .bind(learner_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(enrollment)
    }

    pub async fn get_enrollment(&self, enrollment_id: Uuid) -> Result<Option<DbEnrollment>> {
        let enrollment = sqlx::query_as::<_, DbEnrollment>(&format!(
            "SELECT {} FROM enrollments WHERE id = $1",
            ENROLLMENT_COLUMNS
        ))
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    /// Recompute the aggregate progress percentage and status of an enrollment.
    pub async fn refresh_enrollment_progress(&self, enrollment_id: Uuid) -> Result<DbEnrollment> {
        let mut tx = self.pool.begin().await?;

        let enrollment = lock_enrollment(&mut tx, enrollment_id).await?;

        let total_lessons: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            "#,
        )
        .bind(enrollment.course_id)
        .fetch_one(&mut *tx)
        .await?;

        let (completed, touched): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE completed), COUNT(*)
            FROM lesson_progress
            WHERE enrollment_id = $1
            "#,
        )
        .bind(enrollment_id)
        .fetch_one(&mut *tx)
        .await?;

        let progress = course_progress(
            total_lessons as usize,
            completed as usize,
            touched > 0,
            enrollment.status(),
        );
        let is_completed = progress.status == EnrollmentStatus::Completed;

        let updated = sqlx::query_as::<_, DbEnrollment>(&format!(
            r#"
            UPDATE enrollments
            SET progress_percentage = $2,
                status = $3,
                completed_at = CASE WHEN $4 THEN COALESCE(completed_at, NOW()) ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(enrollment_id)
        .bind(progress.percentage)
        .bind(progress.status.as_str())
        .bind(is_completed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    // === Lesson Progress Repository ===

    /// Insert or merge a progress report.
    ///
    /// Completion is sticky, video progress keeps its maximum and time spent
    /// accumulates across reports.
    pub async fn upsert_lesson_progress(
        &self,
        enrollment_id: Uuid,
        lesson_id: Uuid,
        update: &ProgressUpdate,
    ) -> Result<DbLessonProgress> {
        let progress = sqlx::query_as::<_, DbLessonProgress>(&format!(
            r#"
            INSERT INTO lesson_progress (enrollment_id, lesson_id, completed, completed_at,
                                         time_spent_seconds, video_progress)
            VALUES ($1, $2, $3, CASE WHEN $3 THEN NOW() END, $4, COALESCE($5, 0.0))
            ON CONFLICT (enrollment_id, lesson_id) DO UPDATE SET
                completed = lesson_progress.completed OR EXCLUDED.completed,
                completed_at = COALESCE(lesson_progress.completed_at, EXCLUDED.completed_at),
                time_spent_seconds = lesson_progress.time_spent_seconds + EXCLUDED.time_spent_seconds,
                video_progress = GREATEST(lesson_progress.video_progress, EXCLUDED.video_progress),
                updated_at = NOW()
            RETURNING {}
            "#,
            PROGRESS_COLUMNS
        ))
        .bind(enrollment_id)
        .bind(lesson_id)
        .bind(update.completed)
        .bind(update.time_spent_seconds)
        .bind(update.video_progress)
        .fetch_one(&self.pool)
        .await?;

        Ok(progress)
    }

    pub async fn get_enrollment_progress(&self, enrollment_id: Uuid) -> Result<Vec<DbLessonProgress>> {
        let rows = sqlx::query_as::<_, DbLessonProgress>(&format!(
            "SELECT {} FROM lesson_progress WHERE enrollment_id = $1 ORDER BY created_at",
            PROGRESS_COLUMNS
        ))
        .bind(enrollment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Per-module completion of an enrollment, in module order.
    pub async fn get_module_completions(
        &self,
        enrollment: &DbEnrollment,
    ) -> Result<Vec<(DbModule, ModuleCompletion)>> {
        let modules = self.get_course_modules(enrollment.course_id).await?;

        let rows: Vec<(Uuid, Uuid, bool)> = sqlx::query_as(
            r#"
            SELECT l.module_id, l.id, COALESCE(lp.completed, FALSE)
            FROM lessons l
            JOIN course_modules m ON m.id = l.module_id
            LEFT JOIN lesson_progress lp
                   ON lp.lesson_id = l.id AND lp.enrollment_id = $2
            WHERE m.course_id = $1
            ORDER BY m.position, l.position
            "#,
        )
        .bind(enrollment.course_id)
        .bind(enrollment.id)
        .fetch_all(&self.pool)
        .await?;

        let mut lessons: HashMap<Uuid, (Vec<Uuid>, Vec<Uuid>)> = HashMap::new();
        for (module_id, lesson_id, completed) in rows {
            let entry = lessons.entry(module_id).or_default();
            entry.0.push(lesson_id);
            if completed {
                entry.1.push(lesson_id);
            }
        }

        Ok(modules
            .into_iter()
            .map(|m| {
                let (all, done) = lessons.remove(&m.id).unwrap_or_default();
                let completion = evaluate_module(&all, &done);
                (m, completion)
            })
            .collect())
    }

    // === Certificate Repository ===

    /// Check a module for completion and issue its certificate atomically.
    ///
    /// The enrollment row is locked for the duration of the check, and the
    /// insert relies on the unique (module_id, learner_id) index, so racing
    /// final-lesson completions produce a single certificate.
    pub async fn issue_module_certificate(
        &self,
        enrollment_id: Uuid,
        module_id: Uuid,
        policy: &dyn GradePolicy,
    ) -> Result<IssueOutcome> {
        let mut tx = self.pool.begin().await?;

        let enrollment = lock_enrollment(&mut tx, enrollment_id).await?;

        let module_course: Option<Uuid> =
            sqlx::query_scalar("SELECT course_id FROM course_modules WHERE id = $1")
                .bind(module_id)
                .fetch_optional(&mut *tx)
                .await?;
        match module_course {
            None => return Err(ApiError::NotFound(format!("Module {}", module_id))),
            Some(course_id) if course_id != enrollment.course_id => {
                return Err(ApiError::BadRequest(format!(
                    "Module {} is not part of the enrolled course",
                    module_id
                )))
            }
            Some(_) => {}
        }

        if let Some(existing) = find_certificate(&mut tx, module_id, enrollment.learner_id).await? {
            tx.commit().await?;
            return Ok(IssueOutcome::AlreadyIssued(existing));
        }

        let lesson_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM lessons WHERE module_id = $1 ORDER BY position",
        )
        .bind(module_id)
        .fetch_all(&mut *tx)
        .await?;

        let completed_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT lp.lesson_id
            FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            WHERE lp.enrollment_id = $1 AND l.module_id = $2 AND lp.completed
            "#,
        )
        .bind(enrollment_id)
        .bind(module_id)
        .fetch_all(&mut *tx)
        .await?;

        let completion = evaluate_module(&lesson_ids, &completed_ids);
        if !completion.is_complete() {
            tx.commit().await?;
            return Ok(IssueOutcome::Incomplete(completion));
        }

        let scores: Vec<(String, f64)> = sqlx::query_as(
            r#"
            SELECT l.kind, COALESCE(lp.video_progress, 0.0)
            FROM lessons l
            LEFT JOIN lesson_progress lp
                   ON lp.lesson_id = l.id AND lp.enrollment_id = $2
            WHERE l.module_id = $1
            ORDER BY l.position
            "#,
        )
        .bind(module_id)
        .bind(enrollment_id)
        .fetch_all(&mut *tx)
        .await?;

        let scores: Vec<LessonScore> = scores
            .into_iter()
            .map(|(kind, video_progress)| LessonScore {
                kind: LessonKind::from_str(&kind).unwrap_or(LessonKind::Text),
                video_progress,
            })
            .collect();

        let issued_at: DateTime<Utc> = Utc::now();
        let grade = policy.grade(&scores);
        let code = verification_code(module_id, enrollment.learner_id, issued_at);

        let inserted = sqlx::query_as::<_, DbCertificate>(&format!(
            r#"
            INSERT INTO module_certificates (module_id, learner_id, enrollment_id,
                                             verification_code, grade, issued_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (module_id, learner_id) DO NOTHING
            RETURNING {}
            "#,
            CERTIFICATE_COLUMNS
        ))
        .bind(module_id)
        .bind(enrollment.learner_id)
        .bind(enrollment_id)
        .bind(&code)
        .bind(grade)
        .bind(issued_at)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(certificate) => {
                tracing::info!(
                    "Issued certificate {} for module {} to learner {} (grade {:.1}, policy {})",
                    certificate.id,
                    module_id,
                    enrollment.learner_id,
                    grade,
                    policy.name()
                );
                IssueOutcome::Issued(certificate)
            }
            None => {
                let existing = find_certificate(&mut tx, module_id, enrollment.learner_id)
                    .await?
                    .ok_or_else(|| ApiError::Internal("Certificate conflict without row".to_string()))?;
                IssueOutcome::AlreadyIssued(existing)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn get_certificate(&self, certificate_id: Uuid) -> Result<Option<DbCertificate>> {
        let certificate = sqlx::query_as::<_, DbCertificate>(&format!(
            "SELECT {} FROM module_certificates WHERE id = $1",
            CERTIFICATE_COLUMNS
        ))
        .bind(certificate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    pub async fn get_certificates_for_learner(&self, learner_id: Uuid) -> Result<Vec<DbCertificate>> {
        let certificates = sqlx::query_as::<_, DbCertificate>(&format!(
            "SELECT {} FROM module_certificates WHERE learner_id = $1 ORDER BY issued_at DESC",
            CERTIFICATE_COLUMNS
        ))
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    pub async fn get_certificates_for_enrollment(&self, enrollment_id: Uuid) -> Result<Vec<DbCertificate>> {
        let certificates = sqlx::query_as::<_, DbCertificate>(&format!(
            "SELECT {} FROM module_certificates WHERE enrollment_id = $1",
            CERTIFICATE_COLUMNS
        ))
        .bind(enrollment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    pub async fn get_certificate_details(&self, certificate_id: Uuid) -> Result<Option<CertificateDetails>> {
        let details = sqlx::query_as::<_, CertificateDetails>(&format!(
            "{} WHERE c.id = $1",
            CERTIFICATE_DETAILS_SELECT
        ))
        .bind(certificate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    pub async fn get_certificate_by_code(&self, code: &str) -> Result<Option<CertificateDetails>> {
        let details = sqlx::query_as::<_, CertificateDetails>(&format!(
            "{} WHERE c.verification_code = $1",
            CERTIFICATE_DETAILS_SELECT
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    pub async fn set_certificate_file_key(&self, certificate_id: Uuid, file_key: &str) -> Result<()> {
        sqlx::query("UPDATE module_certificates SET file_key = $2 WHERE id = $1")
            .bind(certificate_id)
            .bind(file_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Lock an enrollment row until the surrounding transaction ends.
async fn lock_enrollment(conn: &mut PgConnection, enrollment_id: Uuid) -> Result<DbEnrollment> {
    sqlx::query_as::<_, DbEnrollment>(&format!(
        "SELECT {} FROM enrollments WHERE id = $1 FOR NO KEY UPDATE",
        ENROLLMENT_COLUMNS
    ))
    .bind(enrollment_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Enrollment {}", enrollment_id)))
}

async fn find_certificate(
    conn: &mut PgConnection,
    module_id: Uuid,
    learner_id: Uuid,
) -> Result<Option<DbCertificate>> {
    let certificate = sqlx::query_as::<_, DbCertificate>(&format!(
        "SELECT {} FROM module_certificates WHERE module_id = $1 AND learner_id = $2",
        CERTIFICATE_COLUMNS
    ))
    .bind(module_id)
    .bind(learner_id)
    .fetch_optional(conn)
    .await?;

    Ok(certificate)
}

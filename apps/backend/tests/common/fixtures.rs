//! Test fixtures and factory functions for creating test data.

use serde_json::json;
use uuid::Uuid;

/// Unique email to avoid collisions between test runs.
pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &Uuid::new_v4().to_string()[..8])
}

/// Create a learner register request body.
pub fn register_request(email: &str, instructor_code: Option<&str>) -> serde_json::Value {
    match instructor_code {
        Some(code) => json!({
            "email": email,
            "name": "Test Instructor",
            "role": "instructor",
            "instructor_code": code
        }),
        None => json!({ "email": email, "name": "Test Learner" }),
    }
}

/// Create a course body with one module per entry, each holding that many
/// lessons. The first lesson of every module is a video.
pub fn course_request(lessons_per_module: &[usize]) -> serde_json::Value {
    let modules: Vec<serde_json::Value> = lessons_per_module
        .iter()
        .enumerate()
        .map(|(m, &count)| {
            let lessons: Vec<serde_json::Value> = (0..count)
                .map(|l| {
                    if l == 0 {
                        json!({
                            "title": format!("Lesson {}.{}", m + 1, l + 1),
                            "kind": "video",
                            "video_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                            "duration_seconds": 212
                        })
                    } else {
                        json!({
                            "title": format!("Lesson {}.{}", m + 1, l + 1),
                            "kind": "text"
                        })
                    }
                })
                .collect();
            json!({ "title": format!("Module {}", m + 1), "lessons": lessons })
        })
        .collect();

    json!({
        "title": format!("Course {}", &Uuid::new_v4().to_string()[..8]),
        "description": "Integration test course",
        "modules": modules
    })
}

/// Create a lesson progress request body.
pub fn progress_request(enrollment_id: Uuid, lesson_id: Uuid, completed: bool) -> serde_json::Value {
    json!({
        "enrollment_id": enrollment_id,
        "lesson_id": lesson_id,
        "completed": completed,
        "time_spent_seconds": 60,
        "video_progress": 1.0
    })
}

/// Create a module certificate request body.
pub fn module_certificate_request(enrollment_id: Uuid, module_id: Uuid) -> serde_json::Value {
    json!({ "enrollment_id": enrollment_id, "module_id": module_id })
}

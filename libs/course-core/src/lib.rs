//! Core course-progress library used by the backend.
//!
//! Provides:
//! - Module completion evaluation and course progress aggregation
//! - Certificate grade policies
//! - Video URL parsing for lesson authoring
//! - Shared types (LessonKind, EnrollmentStatus, BucketKind, etc.)

pub mod completion;
pub mod error;
pub mod grading;
pub mod types;
pub mod video;

pub use completion::{course_progress, evaluate_module, CourseProgress, ModuleCompletion};
pub use error::{CoreError, Result};
pub use grading::{get_policy, GradePolicy, LessonScore};
pub use types::{BucketKind, EnrollmentStatus, LessonKind, ProgressUpdate, Role};
pub use video::{embed_url, extract_youtube_id, is_youtube_url};

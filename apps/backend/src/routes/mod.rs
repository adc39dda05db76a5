pub mod auth;
pub mod certificates;
pub mod courses;
pub mod enrollments;
pub mod files;
pub mod learners;
pub mod progress;

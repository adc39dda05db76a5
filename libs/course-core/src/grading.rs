//! Certificate grade policies.

use serde::{Deserialize, Serialize};

use crate::types::LessonKind;

/// Per-lesson input to a grade policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LessonScore {
    pub kind: LessonKind,
    /// Fraction of the video watched; ignored for non-video lessons.
    pub video_progress: f64,
}

/// Trait for turning a completed module's lesson progress into a grade (0-100).
pub trait GradePolicy: Send + Sync {
    /// Policy identifier.
    fn name(&self) -> &'static str;

    /// Grade for a fully completed module.
    fn grade(&self, lessons: &[LessonScore]) -> f64;
}

/// Every completed module earns full marks.
#[derive(Debug, Clone, Default)]
pub struct CompletionGrade;

impl GradePolicy for CompletionGrade {
    fn name(&self) -> &'static str {
        "completion"
    }

    fn grade(&self, _lessons: &[LessonScore]) -> f64 {
        100.0
    }
}

/// Grade by how much of each video was actually watched.
#[derive(Debug, Clone, Default)]
pub struct EngagementGrade;

impl GradePolicy for EngagementGrade {
    fn name(&self) -> &'static str {
        "engagement"
    }

    fn grade(&self, lessons: &[LessonScore]) -> f64 {
        if lessons.is_empty() {
            return 100.0;
        }

        let sum: f64 = lessons
            .iter()
            .map(|l| match l.kind {
                LessonKind::Video => l.video_progress.clamp(0.0, 1.0),
                LessonKind::Text | LessonKind::Exercise => 1.0,
            })
            .sum();

        let grade = sum / lessons.len() as f64 * 100.0;
        (grade * 10.0).round() / 10.0
    }
}

/// Get grade policy by name.
pub fn get_policy(name: &str) -> Option<Box<dyn GradePolicy>> {
    match name {
        "completion" => Some(Box::new(CompletionGrade)),
        "engagement" => Some(Box::new(EngagementGrade)),
        _ => None,
    }
}

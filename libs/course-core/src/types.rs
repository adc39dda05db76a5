//! Core types for the course platform.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Kind of lesson content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Video,
    Text,
    Exercise,
}

impl LessonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Text => "text",
            Self::Exercise => "exercise",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "text" => Some(Self::Text),
            "exercise" => Some(Self::Exercise),
            _ => None,
        }
    }
}

/// Enrollment lifecycle. Ordered so that `max` never moves a status backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    Active,
    Completed,
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        Self::Enrolled
    }
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "enrolled" => Some(Self::Enrolled),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Move towards `next` without ever regressing.
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}

/// Account role carried in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Learner,
    Instructor,
}

impl Default for Role {
    fn default() -> Self {
        Self::Learner
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::Instructor => "instructor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "learner" => Some(Self::Learner),
            "instructor" => Some(Self::Instructor),
            _ => None,
        }
    }
}

/// Logical object-store bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    Videos,
    Images,
    Documents,
    Courses,
    Lessons,
    Resources,
    Audio,
    Certificates,
}

impl BucketKind {
    pub const ALL: [BucketKind; 8] = [
        Self::Videos,
        Self::Images,
        Self::Documents,
        Self::Courses,
        Self::Lessons,
        Self::Resources,
        Self::Audio,
        Self::Certificates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Images => "images",
            Self::Documents => "documents",
            Self::Courses => "courses",
            Self::Lessons => "lessons",
            Self::Resources => "resources",
            Self::Audio => "audio",
            Self::Certificates => "certificates",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "bucket",
                value: s.to_string(),
            })
    }
}

/// A learner's report of progress on one lesson.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub time_spent_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_progress: Option<f64>,
}

impl ProgressUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.time_spent_seconds < 0 {
            return Err(CoreError::NegativeTimeSpent(self.time_spent_seconds));
        }
        if let Some(p) = self.video_progress {
            if !(0.0..=1.0).contains(&p) {
                return Err(CoreError::InvalidVideoProgress(p));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_regresses() {
        assert_eq!(
            EnrollmentStatus::Completed.advance(EnrollmentStatus::Active),
            EnrollmentStatus::Completed
        );
        assert_eq!(
            EnrollmentStatus::Enrolled.advance(EnrollmentStatus::Active),
            EnrollmentStatus::Active
        );
    }

    #[test]
    fn bucket_parse_accepts_known_names() {
        assert_eq!(BucketKind::parse("audio").unwrap(), BucketKind::Audio);
        assert_eq!(BucketKind::parse("certificates").unwrap(), BucketKind::Certificates);
        assert!(matches!(
            BucketKind::parse("backups"),
            Err(CoreError::UnknownVariant { kind: "bucket", .. })
        ));
    }

    #[test]
    fn progress_update_rejects_out_of_range_video_progress() {
        let update = ProgressUpdate {
            video_progress: Some(1.5),
            ..Default::default()
        };
        assert_eq!(update.validate(), Err(CoreError::InvalidVideoProgress(1.5)));
    }

    #[test]
    fn progress_update_rejects_negative_time() {
        let update = ProgressUpdate {
            time_spent_seconds: -3,
            ..Default::default()
        };
        assert_eq!(update.validate(), Err(CoreError::NegativeTimeSpent(-3)));
    }

    #[test]
    fn progress_update_defaults_from_empty_json() {
        let update: ProgressUpdate = serde_json::from_str("{}").unwrap();
        assert!(!update.completed);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn lesson_kind_roundtrips_through_str() {
        for kind in [LessonKind::Video, LessonKind::Text, LessonKind::Exercise] {
            assert_eq!(LessonKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(LessonKind::from_str("quiz"), None);
    }
}

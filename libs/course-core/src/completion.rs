//! Module completion evaluation and course progress aggregation.
//!
//! Completion is decided by set membership, not by counting rows: every
//! lesson of the module must be present among the completed lessons.
//! Completed ids outside the module and duplicates do not count.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EnrollmentStatus;

/// Outcome of checking one module for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModuleCompletion {
    /// The module has no lessons and is never auto-completed.
    Empty,
    /// Some lessons are still missing, listed in module order.
    Incomplete {
        total: usize,
        completed: usize,
        missing: Vec<Uuid>,
    },
    Complete { total: usize },
}

impl ModuleCompletion {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Number of distinct module lessons completed.
    pub fn completed_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Incomplete { completed, .. } => *completed,
            Self::Complete { total } => *total,
        }
    }

    pub fn total(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Incomplete { total, .. } | Self::Complete { total } => *total,
        }
    }
}

/// Evaluate whether `module_lessons` are all covered by `completed_lessons`.
pub fn evaluate_module(module_lessons: &[Uuid], completed_lessons: &[Uuid]) -> ModuleCompletion {
    let mut seen = HashSet::with_capacity(module_lessons.len());
    let lessons: Vec<Uuid> = module_lessons
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if lessons.is_empty() {
        return ModuleCompletion::Empty;
    }

    let done: HashSet<Uuid> = completed_lessons.iter().copied().collect();
    let missing: Vec<Uuid> = lessons.iter().copied().filter(|id| !done.contains(id)).collect();

    if missing.is_empty() {
        ModuleCompletion::Complete {
            total: lessons.len(),
        }
    } else {
        ModuleCompletion::Incomplete {
            total: lessons.len(),
            completed: lessons.len() - missing.len(),
            missing,
        }
    }
}

/// Aggregate progress of an enrollment across a whole course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub percentage: f64,
    pub status: EnrollmentStatus,
}

/// Compute the enrollment aggregate from lesson counts.
///
/// `touched` is whether the learner has any progress row at all; it moves an
/// enrollment from `enrolled` to `active` before the first completion.
pub fn course_progress(
    total_lessons: usize,
    completed_lessons: usize,
    touched: bool,
    current: EnrollmentStatus,
) -> CourseProgress {
    if total_lessons == 0 {
        return CourseProgress {
            percentage: 0.0,
            status: current,
        };
    }

    let completed = completed_lessons.min(total_lessons);
    let raw = completed as f64 / total_lessons as f64 * 100.0;
    let percentage = (raw * 100.0).round() / 100.0;

    let status = if completed == total_lessons {
        EnrollmentStatus::Completed
    } else if touched || completed > 0 {
        EnrollmentStatus::Active
    } else {
        EnrollmentStatus::Enrolled
    };

    CourseProgress {
        percentage,
        status: current.advance(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn three_lesson_module_completes_on_last_lesson() {
        let lessons = ids(3);

        let after_first = evaluate_module(&lessons, &lessons[..1]);
        assert!(!after_first.is_complete());
        assert_eq!(after_first.completed_count(), 1);

        let after_second = evaluate_module(&lessons, &lessons[..2]);
        assert_eq!(
            after_second,
            ModuleCompletion::Incomplete {
                total: 3,
                completed: 2,
                missing: vec![lessons[2]],
            }
        );

        let after_third = evaluate_module(&lessons, &lessons);
        assert_eq!(after_third, ModuleCompletion::Complete { total: 3 });
    }

    #[test]
    fn empty_module_is_never_complete() {
        assert_eq!(evaluate_module(&[], &ids(2)), ModuleCompletion::Empty);
        assert!(!ModuleCompletion::Empty.is_complete());
    }

    #[test]
    fn foreign_lessons_do_not_fill_the_count() {
        let lessons = ids(2);
        let foreign = ids(1);
        // Two completions, matching the lesson count, but one is from another module.
        let completed = vec![lessons[0], foreign[0]];

        let result = evaluate_module(&lessons, &completed);
        assert_eq!(
            result,
            ModuleCompletion::Incomplete {
                total: 2,
                completed: 1,
                missing: vec![lessons[1]],
            }
        );
    }

    #[test]
    fn duplicate_completions_are_counted_once() {
        let lessons = ids(2);
        let completed = vec![lessons[0], lessons[0]];
        assert!(!evaluate_module(&lessons, &completed).is_complete());
    }

    #[test]
    fn missing_lessons_keep_module_order() {
        let lessons = ids(4);
        let completed = vec![lessons[2]];
        match evaluate_module(&lessons, &completed) {
            ModuleCompletion::Incomplete { missing, .. } => {
                assert_eq!(missing, vec![lessons[0], lessons[1], lessons[3]]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn course_progress_rounds_to_two_decimals() {
        let progress = course_progress(3, 1, true, EnrollmentStatus::Enrolled);
        assert_eq!(progress.percentage, 33.33);
        assert_eq!(progress.status, EnrollmentStatus::Active);
    }

    #[test]
    fn course_progress_completes_when_all_done() {
        let progress = course_progress(4, 4, true, EnrollmentStatus::Active);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(progress.status, EnrollmentStatus::Completed);
    }

    #[test]
    fn touched_enrollment_becomes_active_without_completions() {
        let progress = course_progress(5, 0, true, EnrollmentStatus::Enrolled);
        assert_eq!(progress.percentage, 0.0);
        assert_eq!(progress.status, EnrollmentStatus::Active);
    }

    #[test]
    fn empty_course_keeps_current_status() {
        let progress = course_progress(0, 0, true, EnrollmentStatus::Enrolled);
        assert_eq!(progress.percentage, 0.0);
        assert_eq!(progress.status, EnrollmentStatus::Enrolled);
    }

    #[test]
    fn completed_enrollment_stays_completed() {
        // New lessons authored later lower the percentage but not the status.
        let progress = course_progress(5, 4, true, EnrollmentStatus::Completed);
        assert_eq!(progress.percentage, 80.0);
        assert_eq!(progress.status, EnrollmentStatus::Completed);
    }
}

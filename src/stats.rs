use serde::Serialize;

use crate::models::{Assignment, Submission, SubmissionStatus};

/// Assumed number of students per assignment when estimating the
/// submission rate. There is no enrollment data to divide by instead.
pub const DEFAULT_CLASS_SIZE_BASELINE: u32 = 3;

/// Aggregate figures over every assignment and submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_assignments: usize,
    pub total_submissions: usize,
    /// Percent of `total_assignments * baseline` that were handed in.
    pub submission_rate: u32,
    /// Mean of graded fractions on the 0-10 scale, one decimal.
    pub average_grade: f64,
    /// Percent of submissions that are graded.
    #[serde(rename = "gradedAssignments")]
    pub graded_percent: u32,
}

/// Per-assignment grading progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentProgress {
    pub total_submissions: usize,
    pub graded_submissions: usize,
    pub pending_submissions: usize,
}

pub fn compute_stats(assignments: &[Assignment]) -> Stats {
    compute_stats_with(assignments, DEFAULT_CLASS_SIZE_BASELINE)
}

pub fn compute_stats_with(assignments: &[Assignment], class_size_baseline: u32) -> Stats {
    let total_assignments = assignments.len();
    let submissions = || assignments.iter().flat_map(|a| a.submissions.values());
    let total_submissions = submissions().count();
    let graded = submissions()
        .filter(|s| s.status == SubmissionStatus::Graded)
        .count();

    Stats {
        total_assignments,
        total_submissions,
        submission_rate: completion_rate(
            total_assignments * class_size_baseline as usize,
            total_submissions,
        ),
        average_grade: average_grade(submissions()),
        graded_percent: completion_rate(total_submissions, graded),
    }
}

/// Averages graded fractions on the 0-10 scale, rounded to one decimal.
///
/// Only submissions marked graded with an `obtained/total` grade count.
/// A zero score, a zero total, or a non-numeric grade is left out of the
/// average rather than counted as zero.
pub fn average_grade<'a>(submissions: impl IntoIterator<Item = &'a Submission>) -> f64 {
    let scores: Vec<f64> = submissions
        .into_iter()
        .filter(|s| s.status == SubmissionStatus::Graded)
        .filter_map(|s| s.grade.as_ref()?.normalized())
        .filter(|score| score.is_finite() && *score > 0.0)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// `round(completed / total * 100)`, or 0 when there is nothing to complete.
pub fn completion_rate(total: usize, completed: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

pub fn progress(assignment: &Assignment) -> AssignmentProgress {
    let total = assignment.submissions.len();
    let graded = assignment
        .submissions
        .values()
        .filter(|s| s.status == SubmissionStatus::Graded)
        .count();
    AssignmentProgress {
        total_submissions: total,
        graded_submissions: graded,
        pending_submissions: total - graded,
    }
}

/// Assignments with at least one hand-in still waiting for a grade.
pub fn assignments_to_grade(assignments: &[Assignment]) -> Vec<&Assignment> {
    assignments
        .iter()
        .filter(|a| {
            a.submissions
                .values()
                .any(|s| s.status == SubmissionStatus::Submitted)
        })
        .collect()
}

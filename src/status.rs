use chrono::{DateTime, Utc};

use crate::models::{Assignment, Submission, SubmissionStatus};

/// `true` when `now` is strictly past the due date. The due instant itself
/// is not overdue, and neither is an assignment without a due date.
pub fn is_overdue_at(due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    due_date.is_some_and(|due| now > due)
}

/// Evaluated against the wall clock on every call.
pub fn is_overdue(due_date: Option<DateTime<Utc>>) -> bool {
    is_overdue_at(due_date, Utc::now())
}

/// Status of one student's work on an assignment.
///
/// Priority, first match wins: graded, handed in after the due date,
/// handed in, not handed in and past due, pending.
pub fn status_at(
    assignment: &Assignment,
    submission: Option<&Submission>,
    now: DateTime<Utc>,
) -> SubmissionStatus {
    match submission {
        Some(sub) if sub.grade.is_some() => SubmissionStatus::Graded,
        Some(sub) => match (sub.submitted_at, assignment.due_date) {
            (Some(submitted), Some(due)) if submitted > due => SubmissionStatus::Late,
            _ => SubmissionStatus::Submitted,
        },
        None if is_overdue_at(assignment.due_date, now) => SubmissionStatus::Late,
        None => SubmissionStatus::Pending,
    }
}

pub fn status_of(assignment: &Assignment, submission: Option<&Submission>) -> SubmissionStatus {
    status_at(assignment, submission, Utc::now())
}

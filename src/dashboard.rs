use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::models::{Assignment, StudentId, Submission, SubmissionStatus, User};
use crate::role::Role;
use crate::stats::{self, Stats};
use crate::status;
use crate::store::DomainStore;

const RECENT_ASSIGNMENTS: usize = 5;

/// One assignment as a single student sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAssignment<'a> {
    pub assignment: &'a Assignment,
    pub submission: Option<&'a Submission>,
    pub status: SubmissionStatus,
}

pub fn student_view<'a>(
    assignments: &'a [Assignment],
    student: &StudentId,
    now: DateTime<Utc>,
) -> Vec<StudentAssignment<'a>> {
    assignments
        .iter()
        .map(|assignment| {
            let submission = assignment.submission(student);
            StudentAssignment {
                assignment,
                submission,
                status: status::status_at(assignment, submission, now),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard {
    pub pending: usize,
    pub submitted: usize,
    pub graded: usize,
    pub late: usize,
    pub average_grade: f64,
}

impl StudentDashboard {
    fn from_view(view: &[StudentAssignment<'_>]) -> Self {
        let count = |wanted: SubmissionStatus| view.iter().filter(|v| v.status == wanted).count();
        Self {
            pending: count(SubmissionStatus::Pending),
            submitted: count(SubmissionStatus::Submitted),
            graded: count(SubmissionStatus::Graded),
            late: count(SubmissionStatus::Late),
            average_grade: stats::average_grade(view.iter().filter_map(|v| v.submission)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDashboard {
    pub total_assignments: usize,
    pub total_submissions: usize,
    /// Submissions handed in and not graded yet.
    pub pending_grading: usize,
    pub average_grade: f64,
    pub recent: Vec<Assignment>,
}

impl TeacherDashboard {
    fn from_assignments(assignments: &[Assignment]) -> Self {
        let submissions = || assignments.iter().flat_map(|a| a.submissions.values());
        Self {
            total_assignments: assignments.len(),
            total_submissions: submissions().count(),
            pending_grading: submissions()
                .filter(|s| s.status == SubmissionStatus::Submitted)
                .count(),
            average_grade: stats::average_grade(submissions()),
            recent: assignments.iter().take(RECENT_ASSIGNMENTS).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorDashboard {
    pub total_teachers: usize,
    pub total_students: usize,
    /// Assignments not yet past their due date.
    pub active_assignments: usize,
    pub total_submissions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard {
    Student(StudentDashboard),
    Teacher(TeacherDashboard),
    Director(DirectorDashboard),
}

/// Summary for the signed-in user's home screen.
pub fn dashboard_for(user: &User, store: &DomainStore, now: DateTime<Utc>) -> Dashboard {
    let assignments = store.assignments();
    match user.role {
        Role::Student => {
            let view = student_view(&assignments, &user.student_id(), now);
            Dashboard::Student(StudentDashboard::from_view(&view))
        }
        Role::Teacher => Dashboard::Teacher(TeacherDashboard::from_assignments(&assignments)),
        Role::Director => Dashboard::Director(DirectorDashboard {
            total_teachers: store.users_by_role(Role::Teacher).len(),
            total_students: store.users_by_role(Role::Student).len(),
            active_assignments: assignments
                .iter()
                .filter(|a| !status::is_overdue_at(a.due_date, now))
                .count(),
            total_submissions: assignments.iter().map(|a| a.submissions.len()).sum(),
        }),
    }
}

/// Reports a director can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    General,
    Teachers,
    Students,
}

impl ReportKind {
    pub fn title(self) -> &'static str {
        match self {
            ReportKind::General => "General Performance Report",
            ReportKind::Teachers => "Teacher Performance",
            ReportKind::Students => "Student Achievement",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportKind::General => "general",
            ReportKind::Teachers => "teachers",
            ReportKind::Students => "students",
        })
    }
}

impl FromStr for ReportKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(ReportKind::General),
            "teachers" => Ok(ReportKind::Teachers),
            "students" => Ok(ReportKind::Students),
            other => Err(ClientError::validation(format!("unknown report `{other}`"))),
        }
    }
}

pub fn render_report(kind: ReportKind, stats: &Stats, generated_on: NaiveDate) -> String {
    format!(
        "{title}\n\n\
         - Total assignments: {assignments}\n\
         - Submissions received: {submissions}\n\
         - Submission rate: {rate}%\n\
         - Overall average: {average}/10\n\
         - Graded submissions: {graded}%\n\n\
         Generated on {generated_on}",
        title = kind.title(),
        assignments = stats.total_assignments,
        submissions = stats.total_submissions,
        rate = stats.submission_rate,
        average = stats.average_grade,
        graded = stats.graded_percent,
    )
}

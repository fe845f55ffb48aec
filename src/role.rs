use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Director,
}

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SubmitAssignments,
    ManageAssignments,
    GradeSubmissions,
    ListUsers,
    ViewReports,
}

/// Which assignment collection a role sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentScope {
    /// Assignments the student is expected to hand in.
    Enrolled,
    /// Assignments the teacher created.
    Authored,
    /// Every assignment in the school.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    StudentDashboard,
    TeacherDashboard,
    DirectorDashboard,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Director => "director",
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        match self {
            Role::Student => matches!(capability, Capability::SubmitAssignments),
            Role::Teacher => matches!(
                capability,
                Capability::ManageAssignments | Capability::GradeSubmissions
            ),
            Role::Director => matches!(capability, Capability::ListUsers | Capability::ViewReports),
        }
    }

    pub fn require(self, capability: Capability) -> Result<(), ClientError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(ClientError::Forbidden(format!(
                "{} may not {}",
                self,
                capability.describe()
            )))
        }
    }

    pub fn assignment_scope(self) -> AssignmentScope {
        match self {
            Role::Student => AssignmentScope::Enrolled,
            Role::Teacher => AssignmentScope::Authored,
            Role::Director => AssignmentScope::All,
        }
    }

    pub fn home(self) -> Route {
        match self {
            Role::Student => Route::StudentDashboard,
            Role::Teacher => Route::TeacherDashboard,
            Role::Director => Route::DirectorDashboard,
        }
    }
}

impl Capability {
    fn describe(self) -> &'static str {
        match self {
            Capability::SubmitAssignments => "submit assignments",
            Capability::ManageAssignments => "manage assignments",
            Capability::GradeSubmissions => "grade submissions",
            Capability::ListUsers => "list users",
            Capability::ViewReports => "view reports",
        }
    }
}

impl AssignmentScope {
    pub fn path(self) -> &'static str {
        match self {
            AssignmentScope::Enrolled | AssignmentScope::All => "/assignments",
            AssignmentScope::Authored => "/assignments/teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "director" => Ok(Role::Director),
            other => Err(ClientError::validation(format!("unknown role `{other}`"))),
        }
    }
}

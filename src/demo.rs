use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::{ClientError, Result};
use crate::grade::Grade;
use crate::models::{
    parse_timestamp, Assignment, AssignmentDraft, AssignmentId, AuthProvider, Credentials,
    GradeTarget, GradingData, Registration, Submission, SubmissionDraft, SubmissionId,
    SubmissionStatus, User, UserId,
};
use crate::role::{AssignmentScope, Role};
use crate::session::AuthSession;

pub const DEMO_PASSWORD: &str = "123456";

struct Account {
    user: User,
    password: String,
}

struct DemoState {
    accounts: Vec<Account>,
    tokens: BTreeMap<String, UserId>,
    assignments: Vec<Assignment>,
}

/// In-process backend with seeded accounts, for running without a server.
///
/// Accounts: `teacher@demo.com`, `director@demo.com`, `student@demo.com`
/// and `student2@demo.com`, all with password [`DEMO_PASSWORD`].
pub struct DemoBackend {
    state: Mutex<DemoState>,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_user(id: &str, name: &str, email: &str, role: Role) -> Account {
    Account {
        user: User {
            id: UserId::from(id),
            name: name.to_string(),
            email: email.to_string(),
            role,
            auth_provider: AuthProvider::Email,
        },
        password: DEMO_PASSWORD.to_string(),
    }
}

fn seed_submission(
    student: &User,
    comments: &str,
    submitted_at: &str,
    grade: Option<(Grade, &str)>,
) -> Submission {
    let mut submission = Submission {
        id: Some(SubmissionId(Uuid::new_v4().to_string())),
        submitted_at: parse_timestamp(submitted_at),
        ..Submission::new(student, comments, Utc::now())
    };
    if let Some((grade, feedback)) = grade {
        submission.grade = Some(grade);
        submission.feedback = feedback.to_string();
        submission.status = SubmissionStatus::Graded;
    }
    submission
}

fn seed_assignment(
    id: &str,
    title: &str,
    subject: &str,
    due: &str,
    description: &str,
    submissions: Vec<Submission>,
) -> Assignment {
    let mut draft = AssignmentDraft::new(title, subject);
    draft.description = description.to_string();
    draft.due_date = parse_timestamp(due);
    let mut assignment = Assignment::from_draft(AssignmentId::from(id), &draft);
    assignment.submissions = submissions
        .into_iter()
        .map(|s| (s.student_id.clone(), s))
        .collect();
    assignment
}

impl DemoBackend {
    pub fn new() -> Self {
        let accounts = vec![
            demo_user("1", "Demo Teacher", "teacher@demo.com", Role::Teacher),
            demo_user("2", "Demo Director", "director@demo.com", Role::Director),
            demo_user("3", "Demo Student", "student@demo.com", Role::Student),
            demo_user("4", "Carlos Lopez", "student2@demo.com", Role::Student),
        ];
        let assignments = vec![
            seed_assignment(
                "1",
                "Linear Algebra",
                "Mathematics",
                "2024-12-30",
                "Solve systems of linear equations and matrix problems",
                vec![seed_submission(
                    &accounts[2].user,
                    "Inverse matrices were tricky",
                    "2024-10-25",
                    Some((
                        Grade::fraction(8.0, 10.0),
                        "Good work, review the inverse matrix steps",
                    )),
                )],
            ),
            seed_assignment(
                "2",
                "The Industrial Revolution",
                "History",
                "2024-12-15",
                "Essay on the impact of the industrial revolution on modern society",
                vec![seed_submission(
                    &accounts[3].user,
                    "Focused on the social changes",
                    "2024-10-28",
                    None,
                )],
            ),
        ];
        Self::with_assignments(accounts, assignments)
    }

    /// Seeded accounts with no assignments.
    pub fn empty() -> Self {
        let backend = Self::new();
        if let Ok(mut state) = backend.state.lock() {
            state.assignments.clear();
        }
        backend
    }

    fn with_assignments(accounts: Vec<Account>, assignments: Vec<Assignment>) -> Self {
        Self {
            state: Mutex::new(DemoState {
                accounts,
                tokens: BTreeMap::new(),
                assignments,
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, DemoState>> {
        self.state
            .lock()
            .map_err(|_| ClientError::Storage("demo backend lock poisoned".into()))
    }
}

impl DemoState {
    fn issue(&mut self, user: &User) -> AuthSession {
        let token = format!("demo-{}", Uuid::new_v4());
        self.tokens.insert(token.clone(), user.id.clone());
        AuthSession {
            token,
            user: user.clone(),
        }
    }

    fn authorize(&self, token: &str) -> Result<&User> {
        let id = self.tokens.get(token).ok_or(ClientError::Unauthorized)?;
        self.accounts
            .iter()
            .map(|a| &a.user)
            .find(|u| &u.id == id)
            .ok_or(ClientError::Unauthorized)
    }

    fn authorize_role(&self, token: &str, role: Role) -> Result<&User> {
        let user = self.authorize(token)?;
        if user.role != role {
            return Err(ClientError::Forbidden(format!(
                "{} may not perform this action",
                user.role
            )));
        }
        Ok(user)
    }

    fn assignment_mut(&mut self, id: &AssignmentId) -> Result<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| ClientError::not_found("assignment", id))
    }
}

impl Backend for DemoBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        credentials.validate()?;
        let mut state = self.state()?;
        let email = credentials.email.trim();
        let user = state
            .accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email) && a.password == credentials.password)
            .map(|a| a.user.clone())
            .ok_or(ClientError::InvalidCredentials)?;
        Ok(state.issue(&user))
    }

    async fn register(&self, registration: &Registration) -> Result<AuthSession> {
        registration.validate()?;
        let mut state = self.state()?;
        let email = registration.email.trim();
        if state
            .accounts
            .iter()
            .any(|a| a.user.email.eq_ignore_ascii_case(email))
        {
            return Err(ClientError::validation("email is already registered"));
        }
        let user = User {
            id: UserId(Uuid::new_v4().to_string()),
            name: registration.name.trim().to_string(),
            email: email.to_string(),
            role: registration.role,
            auth_provider: AuthProvider::Email,
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: registration.password.clone(),
        });
        Ok(state.issue(&user))
    }

    async fn profile(&self, token: &str) -> Result<User> {
        Ok(self.state()?.authorize(token)?.clone())
    }

    async fn list_assignments(&self, token: &str, _scope: AssignmentScope) -> Result<Vec<Assignment>> {
        let state = self.state()?;
        state.authorize(token)?;
        Ok(state.assignments.clone())
    }

    async fn create_assignment(&self, token: &str, draft: &AssignmentDraft) -> Result<Assignment> {
        draft.validate()?;
        let mut state = self.state()?;
        state.authorize_role(token, Role::Teacher)?;
        let assignment = Assignment::from_draft(AssignmentId::generate(), draft);
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        token: &str,
        id: &AssignmentId,
        draft: &AssignmentDraft,
    ) -> Result<Assignment> {
        draft.validate()?;
        let mut state = self.state()?;
        state.authorize_role(token, Role::Teacher)?;
        let assignment = state.assignment_mut(id)?;
        assignment.apply(draft);
        Ok(assignment.clone())
    }

    async fn delete_assignment(&self, token: &str, id: &AssignmentId) -> Result<()> {
        let mut state = self.state()?;
        state.authorize_role(token, Role::Teacher)?;
        let before = state.assignments.len();
        state.assignments.retain(|a| &a.id != id);
        if state.assignments.len() == before {
            return Err(ClientError::not_found("assignment", id));
        }
        Ok(())
    }

    async fn submit_assignment(
        &self,
        token: &str,
        student: &User,
        draft: &SubmissionDraft,
    ) -> Result<Submission> {
        draft.validate()?;
        let mut state = self.state()?;
        let caller = state.authorize_role(token, Role::Student)?;
        if caller.id != student.id {
            return Err(ClientError::Forbidden(
                "cannot submit on behalf of another student".into(),
            ));
        }
        let submission = Submission {
            id: Some(SubmissionId(Uuid::new_v4().to_string())),
            ..Submission::new(student, draft.comments.clone(), Utc::now())
        };
        state
            .assignment_mut(&draft.assignment_id)?
            .submissions
            .insert(submission.student_id.clone(), submission.clone());
        Ok(submission)
    }

    async fn grade_submission(
        &self,
        token: &str,
        target: &GradeTarget,
        grading: &GradingData,
    ) -> Result<Submission> {
        grading.grade.validate()?;
        let mut state = self.state()?;
        state.authorize_role(token, Role::Teacher)?;
        let submission = state
            .assignment_mut(&target.assignment_id)?
            .submissions
            .get_mut(&target.student_id)
            .ok_or_else(|| ClientError::not_found("submission", &target.student_id))?;
        submission.grade = Some(grading.grade.clone());
        submission.feedback = grading.feedback.clone();
        submission.status = SubmissionStatus::Graded;
        Ok(submission.clone())
    }

    async fn users_by_role(&self, token: &str, role: Role) -> Result<Vec<User>> {
        let state = self.state()?;
        state.authorize_role(token, Role::Director)?;
        Ok(state
            .accounts
            .iter()
            .map(|a| &a.user)
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }
}

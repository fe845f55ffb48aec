use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{ClientError, Result};
use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, GradingData, StudentId, Submission, SubmissionId,
    SubmissionStatus, User, UserId,
};
use crate::role::Role;

/// Immutable view of the assignment collection.
pub type Snapshot = Arc<Vec<Assignment>>;

#[derive(Debug, Clone, Default)]
struct UserDirectory {
    teachers: Vec<User>,
    students: Vec<User>,
    directors: Vec<User>,
    selected: Option<UserId>,
}

impl UserDirectory {
    fn list(&self, role: Role) -> &Vec<User> {
        match role {
            Role::Student => &self.students,
            Role::Teacher => &self.teachers,
            Role::Director => &self.directors,
        }
    }

    fn list_mut(&mut self, role: Role) -> &mut Vec<User> {
        match role {
            Role::Student => &mut self.students,
            Role::Teacher => &mut self.teachers,
            Role::Director => &mut self.directors,
        }
    }

    fn all(&self) -> impl Iterator<Item = &User> {
        self.teachers
            .iter()
            .chain(self.students.iter())
            .chain(self.directors.iter())
    }
}

/// Canonical assignments, submissions and users.
///
/// Every mutation goes through a method here. Writers copy-on-write the
/// collection, so a [`Snapshot`] taken earlier never sees a half-applied
/// change.
#[derive(Debug, Clone, Default)]
pub struct DomainStore {
    assignments: Snapshot,
    users: UserDirectory,
    loading: bool,
    error: Option<ClientError>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignments(&self) -> Snapshot {
        Arc::clone(&self.assignments)
    }

    pub fn assignment(&self, id: &AssignmentId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| &a.id == id)
    }

    pub fn submission(&self, id: &AssignmentId, student: &StudentId) -> Option<&Submission> {
        self.assignment(id)?.submission(student)
    }

    fn position(&self, id: &AssignmentId) -> Result<usize> {
        self.assignments
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| ClientError::not_found("assignment", id))
    }

    fn write(&mut self) -> &mut Vec<Assignment> {
        Arc::make_mut(&mut self.assignments)
    }

    /// Swaps in a freshly fetched collection. Duplicate ids keep the later copy.
    pub fn replace_assignments(&mut self, incoming: Vec<Assignment>) {
        let mut next: Vec<Assignment> = Vec::with_capacity(incoming.len());
        for assignment in incoming {
            match next.iter_mut().find(|a| a.id == assignment.id) {
                Some(slot) => *slot = assignment,
                None => next.push(assignment),
            }
        }
        tracing::debug!(count = next.len(), "assignments replaced");
        self.assignments = Arc::new(next);
    }

    /// Creates an assignment locally under a fresh id.
    pub fn create_assignment(&mut self, draft: &AssignmentDraft) -> Result<AssignmentId> {
        draft.validate()?;
        let id = AssignmentId::generate();
        self.write().push(Assignment::from_draft(id.clone(), draft));
        tracing::info!(assignment = %id, title = %draft.title.trim(), "assignment created");
        Ok(id)
    }

    /// Adds an assignment the backend created, replacing any copy with the same id.
    pub fn insert_assignment(&mut self, assignment: Assignment) {
        let list = self.write();
        match list.iter_mut().find(|a| a.id == assignment.id) {
            Some(slot) => *slot = assignment,
            None => list.push(assignment),
        }
    }

    pub fn update_assignment(&mut self, id: &AssignmentId, draft: &AssignmentDraft) -> Result<()> {
        draft.validate()?;
        let idx = self.position(id)?;
        self.write()[idx].apply(draft);
        tracing::info!(assignment = %id, "assignment updated");
        Ok(())
    }

    /// Replaces an existing assignment with the backend's copy.
    pub fn replace_assignment(&mut self, assignment: Assignment) -> Result<()> {
        let idx = self.position(&assignment.id)?;
        self.write()[idx] = assignment;
        Ok(())
    }

    /// Removes the assignment and, with it, all of its submissions.
    pub fn delete_assignment(&mut self, id: &AssignmentId) -> Result<Assignment> {
        let idx = self.position(id)?;
        let removed = self.write().remove(idx);
        tracing::info!(
            assignment = %id,
            submissions = removed.submissions.len(),
            "assignment deleted"
        );
        Ok(removed)
    }

    /// Records a student's hand-in. A second hand-in by the same student
    /// replaces the first.
    pub fn submit_assignment(&mut self, id: &AssignmentId, mut submission: Submission) -> Result<()> {
        submission.status = SubmissionStatus::Submitted;
        self.record_submission(id, submission)
    }

    /// Stores a submission exactly as the backend returned it.
    pub fn record_submission(&mut self, id: &AssignmentId, submission: Submission) -> Result<()> {
        let idx = self.position(id)?;
        let student = submission.student_id.clone();
        self.write()[idx]
            .submissions
            .insert(student.clone(), submission);
        tracing::info!(assignment = %id, student = %student, "submission recorded");
        Ok(())
    }

    pub fn grade_assignment(
        &mut self,
        id: &AssignmentId,
        student: &StudentId,
        grading: GradingData,
    ) -> Result<()> {
        grading.grade.validate()?;
        let idx = self.position(id)?;
        // checked before writing so a miss never copies the collection
        if !self.assignments[idx].submissions.contains_key(student) {
            return Err(ClientError::not_found("submission", student));
        }
        let submission = self.write()[idx]
            .submissions
            .get_mut(student)
            .ok_or_else(|| ClientError::not_found("submission", student))?;
        submission.grade = Some(grading.grade);
        submission.feedback = grading.feedback;
        submission.status = SubmissionStatus::Graded;
        tracing::info!(assignment = %id, student = %student, "submission graded");
        Ok(())
    }

    /// Attaches the server's id to a hand-in that was recorded locally.
    pub fn link_submission(
        &mut self,
        id: &AssignmentId,
        student: &StudentId,
        submission_id: SubmissionId,
    ) -> Result<()> {
        let idx = self.position(id)?;
        if !self.assignments[idx].submissions.contains_key(student) {
            return Err(ClientError::not_found("submission", student));
        }
        if let Some(submission) = self.write()[idx].submissions.get_mut(student) {
            submission.id = Some(submission_id);
        }
        Ok(())
    }

    pub fn users_by_role(&self, role: Role) -> &[User] {
        self.users.list(role)
    }

    pub fn user_by_id(&self, id: &UserId) -> Option<&User> {
        self.users.all().find(|u| &u.id == id)
    }

    pub fn set_users(&mut self, role: Role, users: Vec<User>) {
        *self.users.list_mut(role) = users.into_iter().filter(|u| u.role == role).collect();
    }

    pub fn add_user(&mut self, user: User) {
        let list = self.users.list_mut(user.role);
        match list.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => *slot = user,
            None => list.push(user),
        }
    }

    pub fn update_user(&mut self, user: User) -> Result<()> {
        let slot = self
            .users
            .list_mut(user.role)
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| ClientError::not_found("user", &user.id))?;
        *slot = user;
        Ok(())
    }

    pub fn deactivate_user(&mut self, id: &UserId) -> Result<User> {
        let role = self
            .user_by_id(id)
            .map(|u| u.role)
            .ok_or_else(|| ClientError::not_found("user", id))?;
        let list = self.users.list_mut(role);
        let idx = list
            .iter()
            .position(|u| &u.id == id)
            .ok_or_else(|| ClientError::not_found("user", id))?;
        if self.users.selected.as_ref() == Some(id) {
            self.users.selected = None;
        }
        Ok(self.users.list_mut(role).remove(idx))
    }

    /// Picks the user a director is looking at.
    pub fn select_user(&mut self, id: &UserId) -> Result<()> {
        if self.user_by_id(id).is_none() {
            return Err(ClientError::not_found("user", id));
        }
        self.users.selected = Some(id.clone());
        Ok(())
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.users.selected.as_ref().and_then(|id| self.user_by_id(id))
    }

    pub fn clear_selection(&mut self) {
        self.users.selected = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn begin_request(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn finish_request<T>(&mut self, outcome: &Result<T>) {
        self.loading = false;
        self.error = outcome.as_ref().err().cloned();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Assignments with a due date past `now`.
    pub fn overdue(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(move |a| crate::status::is_overdue_at(a.due_date, now))
    }
}

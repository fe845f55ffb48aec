use chrono::{DateTime, NaiveDate, Utc};

use crate::backend::Backend;
use crate::dashboard::{self, Dashboard, ReportKind};
use crate::error::{ClientError, Result};
use crate::models::{
    AssignmentDraft, AssignmentId, Credentials, GradeTarget, GradingData, Registration, StudentId,
    SubmissionDraft, User,
};
use crate::role::{Capability, Role};
use crate::session::{AuthSession, SessionStore};
use crate::stats::{self, Stats, DEFAULT_CLASS_SIZE_BASELINE};
use crate::storage::{self, SecureStore};
use crate::store::{DomainStore, Snapshot};

/// Front door of the client core.
///
/// Owns both stores, the backend and secure storage. Every remote operation
/// checks the caller's role first, touches the stores only after the
/// backend confirms, and signs the user out when the backend rejects the
/// token.
pub struct AccessService<B, S> {
    backend: B,
    storage: S,
    session: SessionStore,
    store: DomainStore,
    class_size_baseline: u32,
}

impl<B: Backend, S: SecureStore> AccessService<B, S> {
    pub fn new(backend: B, storage: S) -> Self {
        Self {
            backend,
            storage,
            session: SessionStore::new(),
            store: DomainStore::new(),
            class_size_baseline: DEFAULT_CLASS_SIZE_BASELINE,
        }
    }

    pub fn with_class_size_baseline(mut self, baseline: u32) -> Self {
        self.class_size_baseline = baseline;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// For presentation-only state such as dialog flags.
    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    pub fn store(&self) -> &DomainStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn stats(&self) -> Stats {
        stats::compute_stats_with(&self.store.assignments(), self.class_size_baseline)
    }

    pub fn dashboard(&self, now: DateTime<Utc>) -> Option<Dashboard> {
        let user = self.session.user()?;
        Some(dashboard::dashboard_for(user, &self.store, now))
    }

    pub fn report(&self, kind: ReportKind, generated_on: NaiveDate) -> Result<String> {
        self.authorize(Capability::ViewReports)?;
        Ok(dashboard::render_report(kind, &self.stats(), generated_on))
    }

    /// Adopts the session left in secure storage by a previous run, if any.
    /// The token is not checked against the backend; see
    /// [`validate_session`](Self::validate_session).
    pub async fn restore_session(&mut self) -> Result<bool> {
        match storage::load_session(&self.storage).await? {
            Some(auth) => {
                self.session.restore(auth);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<User> {
        let was_active = self.session.is_authenticated();
        if let Err(err) = self.session.begin_login(credentials) {
            self.discard_previous(was_active).await;
            return Err(err);
        }
        let outcome = self.backend.login(credentials).await;
        self.establish(outcome, was_active).await
    }

    pub async fn register(&mut self, registration: &Registration) -> Result<User> {
        let was_active = self.session.is_authenticated();
        if let Err(err) = registration.validate() {
            self.session.fail_login(err.clone());
            self.discard_previous(was_active).await;
            return Err(err);
        }
        self.session.begin();
        let outcome = self.backend.register(registration).await;
        self.establish(outcome, was_active).await
    }

    /// A failed attempt leaves the session anonymous, so whatever the
    /// previous user had loaded or persisted goes with it.
    async fn discard_previous(&mut self, was_active: bool) {
        if !was_active {
            return;
        }
        self.store.reset();
        if let Err(err) = storage::clear_session(&self.storage).await {
            tracing::warn!(error = %err, "failed to clear persisted session");
        }
    }

    async fn establish(&mut self, outcome: Result<AuthSession>, was_active: bool) -> Result<User> {
        let outcome = match outcome {
            Ok(auth) => match storage::persist_session(&self.storage, &auth).await {
                Ok(()) => Ok(auth),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        match outcome {
            Ok(auth) => {
                let user = auth.user.clone();
                // a fresh identity never sees the previous user's data
                self.store.reset();
                self.session.complete_login(auth);
                Ok(user)
            }
            Err(err) => {
                self.session.fail_login(err.clone());
                self.discard_previous(was_active).await;
                Err(err)
            }
        }
    }

    /// Re-fetches the profile behind the current token.
    pub async fn validate_session(&mut self) -> Result<User> {
        let (token, _) = self.credentials()?;
        let outcome = self.backend.profile(&token).await;
        let user = self.settle(outcome).await?;
        let auth = AuthSession {
            token,
            user: user.clone(),
        };
        storage::persist_session(&self.storage, &auth).await?;
        self.session.complete_login(auth);
        Ok(user)
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.session.logout();
        self.store.reset();
        storage::clear_session(&self.storage).await
    }

    /// Fetches the assignments visible to the signed-in role and replaces
    /// the local collection with them.
    pub async fn list_assignments(&mut self) -> Result<Snapshot> {
        let (token, user) = self.credentials()?;
        self.store.begin_request();
        let outcome = self
            .backend
            .list_assignments(&token, user.role.assignment_scope())
            .await;
        let assignments = self.settle(outcome).await?;
        self.store.replace_assignments(assignments);
        Ok(self.store.assignments())
    }

    pub async fn create_assignment(&mut self, draft: &AssignmentDraft) -> Result<AssignmentId> {
        let (token, _) = self.authorize(Capability::ManageAssignments)?;
        draft.validate()?;
        self.store.begin_request();
        let outcome = self.backend.create_assignment(&token, draft).await;
        let assignment = self.settle(outcome).await?;
        let id = assignment.id.clone();
        tracing::info!(assignment = %id, "assignment created");
        self.store.insert_assignment(assignment);
        Ok(id)
    }

    pub async fn update_assignment(
        &mut self,
        id: &AssignmentId,
        draft: &AssignmentDraft,
    ) -> Result<()> {
        let (token, _) = self.authorize(Capability::ManageAssignments)?;
        draft.validate()?;
        self.store.begin_request();
        let outcome = self.backend.update_assignment(&token, id, draft).await;
        let assignment = self.settle(outcome).await?;
        self.store.insert_assignment(assignment);
        Ok(())
    }

    pub async fn delete_assignment(&mut self, id: &AssignmentId) -> Result<()> {
        let (token, _) = self.authorize(Capability::ManageAssignments)?;
        self.store.begin_request();
        let outcome = self.backend.delete_assignment(&token, id).await;
        self.settle(outcome).await?;
        if self.store.assignment(id).is_some() {
            self.store.delete_assignment(id)?;
        }
        Ok(())
    }

    /// Hands in the signed-in student's work. An assignment that is not in
    /// the local collection is rejected without a round trip.
    pub async fn submit_assignment(&mut self, id: &AssignmentId, comments: &str) -> Result<()> {
        let (token, user) = self.authorize(Capability::SubmitAssignments)?;
        if self.store.assignment(id).is_none() {
            return Err(ClientError::not_found("assignment", id));
        }
        let draft = SubmissionDraft::new(id.clone(), comments);
        self.store.begin_request();
        let outcome = self.backend.submit_assignment(&token, &user, &draft).await;
        let submission = self.settle(outcome).await?;
        self.store.submit_assignment(id, submission)
    }

    pub async fn grade_submission(
        &mut self,
        id: &AssignmentId,
        student: &StudentId,
        grading: GradingData,
    ) -> Result<()> {
        let (token, _) = self.authorize(Capability::GradeSubmissions)?;
        grading.grade.validate()?;
        let submission = self
            .store
            .submission(id, student)
            .ok_or_else(|| ClientError::not_found("submission", student))?;
        let target = GradeTarget {
            assignment_id: id.clone(),
            student_id: student.clone(),
            submission_id: submission.id.clone(),
        };
        self.store.begin_request();
        let outcome = self.backend.grade_submission(&token, &target, &grading).await;
        let graded = self.settle(outcome).await?;
        // the reply may omit the student's name and comments; keep ours
        self.store.grade_assignment(id, student, grading)?;
        match graded.id {
            Some(submission_id) => self.store.link_submission(id, student, submission_id),
            None => Ok(()),
        }
    }

    pub async fn users_by_role(&mut self, role: Role) -> Result<Vec<User>> {
        let (token, _) = self.authorize(Capability::ListUsers)?;
        self.store.begin_request();
        let outcome = self.backend.users_by_role(&token, role).await;
        let users = self.settle(outcome).await?;
        self.store.set_users(role, users.clone());
        Ok(users)
    }

    fn credentials(&self) -> Result<(String, User)> {
        let auth = self.session.current().ok_or(ClientError::Unauthorized)?;
        Ok((auth.token.clone(), auth.user.clone()))
    }

    fn authorize(&self, capability: Capability) -> Result<(String, User)> {
        let (token, user) = self.credentials()?;
        if let Err(err) = user.role.require(capability) {
            tracing::warn!(user = %user.id, error = %err, "operation refused");
            return Err(err);
        }
        Ok((token, user))
    }

    /// Records the outcome of a backend call. A rejected token ends the
    /// session here.
    async fn settle<T>(&mut self, outcome: Result<T>) -> Result<T> {
        self.store.finish_request(&outcome);
        if let Err(ClientError::Unauthorized) = &outcome {
            tracing::warn!("token rejected by backend, signing out");
            self.store.reset();
            self.session.expire();
            if let Err(err) = storage::clear_session(&self.storage).await {
                tracing::warn!(error = %err, "failed to clear persisted session");
            }
        }
        outcome
    }
}

use crate::error::Result;
use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, Credentials, GradeTarget, GradingData, Registration,
    Submission, SubmissionDraft, User,
};
use crate::role::{AssignmentScope, Role};
use crate::session::AuthSession;

/// The remote side of the client: authentication plus assignment CRUD.
///
/// Implementations map their own transport failures into
/// [`ClientError`](crate::error::ClientError); callers never see a raw
/// transport error.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession>;
    async fn register(&self, registration: &Registration) -> Result<AuthSession>;
    async fn profile(&self, token: &str) -> Result<User>;

    async fn list_assignments(&self, token: &str, scope: AssignmentScope) -> Result<Vec<Assignment>>;
    async fn create_assignment(&self, token: &str, draft: &AssignmentDraft) -> Result<Assignment>;
    async fn update_assignment(
        &self,
        token: &str,
        id: &AssignmentId,
        draft: &AssignmentDraft,
    ) -> Result<Assignment>;
    async fn delete_assignment(&self, token: &str, id: &AssignmentId) -> Result<()>;

    /// `student` is the signed-in user handing in the work.
    async fn submit_assignment(
        &self,
        token: &str,
        student: &User,
        draft: &SubmissionDraft,
    ) -> Result<Submission>;
    async fn grade_submission(
        &self,
        token: &str,
        target: &GradeTarget,
        grading: &GradingData,
    ) -> Result<Submission>;

    async fn users_by_role(&self, token: &str, role: Role) -> Result<Vec<User>>;
}

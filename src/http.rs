use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::Backend;
use crate::error::{ClientError, Result};
use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, Credentials, GradeTarget, GradingData, Registration,
    Submission, SubmissionDraft, User,
};
use crate::role::{AssignmentScope, Role};
use crate::session::AuthSession;

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct AssignmentsEnvelope {
    assignments: Vec<Assignment>,
}

#[derive(Deserialize)]
struct AssignmentEnvelope {
    assignment: Assignment,
}

#[derive(Deserialize)]
struct SubmissionEnvelope {
    submission: Submission,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    users: Vec<User>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionBody<'a> {
    assignment_id: &'a AssignmentId,
    comments: &'a str,
}

/// REST client for the classroom API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-2xx response into a taxonomy error, using the server's
    /// `message` when it sent one.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        };
        tracing::debug!(status = status.as_u16(), %message, "request rejected");
        Err(ClientError::from_status(status, message))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

impl Backend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        tracing::debug!(email = %credentials.email, "POST /auth/login");
        let request = self.client.post(self.url("/auth/login")).json(credentials);
        match self.send(request).await {
            Err(ClientError::Unauthorized) => Err(ClientError::InvalidCredentials),
            other => other,
        }
    }

    async fn register(&self, registration: &Registration) -> Result<AuthSession> {
        tracing::debug!(email = %registration.email, "POST /auth/register");
        self.send(self.client.post(self.url("/auth/register")).json(registration))
            .await
    }

    async fn profile(&self, token: &str) -> Result<User> {
        #[derive(Deserialize)]
        struct ProfileEnvelope {
            user: User,
        }
        let envelope: ProfileEnvelope = self
            .send(self.client.get(self.url("/auth/profile")).bearer_auth(token))
            .await?;
        Ok(envelope.user)
    }

    async fn list_assignments(&self, token: &str, scope: AssignmentScope) -> Result<Vec<Assignment>> {
        tracing::debug!(path = scope.path(), "GET assignments");
        let envelope: AssignmentsEnvelope = self
            .send(self.client.get(self.url(scope.path())).bearer_auth(token))
            .await?;
        Ok(envelope.assignments)
    }

    async fn create_assignment(&self, token: &str, draft: &AssignmentDraft) -> Result<Assignment> {
        let envelope: AssignmentEnvelope = self
            .send(
                self.client
                    .post(self.url("/assignments"))
                    .bearer_auth(token)
                    .json(draft),
            )
            .await?;
        Ok(envelope.assignment)
    }

    async fn update_assignment(
        &self,
        token: &str,
        id: &AssignmentId,
        draft: &AssignmentDraft,
    ) -> Result<Assignment> {
        let envelope: AssignmentEnvelope = self
            .send(
                self.client
                    .put(self.url(&format!("/assignments/{id}")))
                    .bearer_auth(token)
                    .json(draft),
            )
            .await?;
        Ok(envelope.assignment)
    }

    async fn delete_assignment(&self, token: &str, id: &AssignmentId) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/assignments/{id}")))
            .bearer_auth(token);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn submit_assignment(
        &self,
        token: &str,
        _student: &User,
        draft: &SubmissionDraft,
    ) -> Result<Submission> {
        // the server derives the student from the bearer token
        let body = SubmissionBody {
            assignment_id: &draft.assignment_id,
            comments: &draft.comments,
        };
        let envelope: SubmissionEnvelope = self
            .send(
                self.client
                    .post(self.url("/submissions"))
                    .bearer_auth(token)
                    .json(&body),
            )
            .await?;
        Ok(envelope.submission)
    }

    async fn grade_submission(
        &self,
        token: &str,
        target: &GradeTarget,
        grading: &GradingData,
    ) -> Result<Submission> {
        let Some(id) = &target.submission_id else {
            return Err(ClientError::not_found("submission", &target.student_id));
        };
        let envelope: SubmissionEnvelope = self
            .send(
                self.client
                    .put(self.url(&format!("/submissions/{id}/grade")))
                    .bearer_auth(token)
                    .json(grading),
            )
            .await?;
        Ok(envelope.submission)
    }

    async fn users_by_role(&self, token: &str, role: Role) -> Result<Vec<User>> {
        let envelope: UsersEnvelope = self
            .send(
                self.client
                    .get(self.url("/users"))
                    .bearer_auth(token)
                    .query(&[("role", role.as_str())]),
            )
            .await?;
        Ok(envelope.users)
    }
}

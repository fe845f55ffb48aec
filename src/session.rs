use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::models::{Credentials, ProfilePatch, User};
use crate::role::Role;
use crate::validate;

/// What a successful login or registration yields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated(AuthSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    Assignment,
    Submission,
    Grades,
    Reports,
}

/// Open/closed state of the session-scoped dialogs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalFlags {
    pub assignment: bool,
    pub submission: bool,
    pub grades: bool,
    pub reports: bool,
}

impl ModalFlags {
    fn slot(&mut self, modal: Modal) -> &mut bool {
        match modal {
            Modal::Assignment => &mut self.assignment,
            Modal::Submission => &mut self.submission,
            Modal::Grades => &mut self.grades,
            Modal::Reports => &mut self.reports,
        }
    }

    pub fn is_open(&self, modal: Modal) -> bool {
        match modal {
            Modal::Assignment => self.assignment,
            Modal::Submission => self.submission,
            Modal::Grades => self.grades,
            Modal::Reports => self.reports,
        }
    }

    pub fn any_open(&self) -> bool {
        self.assignment || self.submission || self.grades || self.reports
    }
}

/// The one authoritative record of who is signed in.
///
/// `Anonymous -> Authenticating -> Authenticated`, back to `Anonymous` on
/// logout or a failed attempt.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: AuthState,
    error: Option<ClientError>,
    modals: ModalFlags,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            state: AuthState::Anonymous,
            error: None,
            modals: ModalFlags::default(),
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn current(&self) -> Option<&AuthSession> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.current().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.current().map(|s| s.token.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Authenticating)
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Starts a login attempt. Missing fields fail here without a round trip.
    pub fn begin_login(&mut self, credentials: &Credentials) -> Result<()> {
        if let Err(err) = credentials.validate() {
            self.fail_login(err.clone());
            return Err(err);
        }
        self.begin();
        Ok(())
    }

    /// Starts a registration attempt.
    pub fn begin(&mut self) {
        self.state = AuthState::Authenticating;
        self.error = None;
    }

    pub fn complete_login(&mut self, session: AuthSession) {
        tracing::info!(user = %session.user.id, role = %session.user.role, "session authenticated");
        self.state = AuthState::Authenticated(session);
        self.error = None;
    }

    pub fn fail_login(&mut self, err: ClientError) {
        tracing::warn!(error = %err, "login failed");
        self.state = AuthState::Anonymous;
        self.error = Some(err);
    }

    /// Adopts a session read back from secure storage.
    pub fn restore(&mut self, session: AuthSession) {
        tracing::info!(user = %session.user.id, "session restored");
        self.state = AuthState::Authenticated(session);
        self.error = None;
    }

    /// Tears the session down, including any dialogs left open.
    pub fn logout(&mut self) {
        if let Some(user) = self.user() {
            tracing::info!(user = %user.id, "session closed");
        }
        self.state = AuthState::Anonymous;
        self.error = None;
        self.modals = ModalFlags::default();
    }

    /// Ends a session the backend stopped accepting.
    pub fn expire(&mut self) {
        self.logout();
        self.error = Some(ClientError::Unauthorized);
    }

    /// Overwrites the token; there is no renewal protocol.
    pub fn refresh_token(&mut self, token: impl Into<String>) -> Result<()> {
        match &mut self.state {
            AuthState::Authenticated(session) => {
                session.token = token.into();
                Ok(())
            }
            _ => Err(ClientError::Unauthorized),
        }
    }

    pub fn update_profile(&mut self, patch: ProfilePatch) -> Result<()> {
        if let Some(email) = &patch.email {
            if !validate::is_valid_email(email) {
                return Err(ClientError::validation("email address is malformed"));
            }
        }
        if let Some(name) = &patch.name {
            validate::required("name", name)?;
        }
        let AuthState::Authenticated(session) = &mut self.state else {
            return Err(ClientError::Unauthorized);
        };
        if let Some(name) = patch.name {
            session.user.name = name;
        }
        if let Some(email) = patch.email {
            session.user.email = email;
        }
        Ok(())
    }

    pub fn modals(&self) -> ModalFlags {
        self.modals
    }

    pub fn open_modal(&mut self, modal: Modal) {
        *self.modals.slot(modal) = true;
    }

    pub fn close_modal(&mut self, modal: Modal) {
        *self.modals.slot(modal) = false;
    }
}

use http::StatusCode;
use thiserror::Error;

/// Every failure the client core can report.
///
/// Stores and derivations return these as values; only the access layer
/// turns transport failures into them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("session expired or invalid")]
    Unauthorized,
    #[error("not permitted: {0}")]
    Forbidden(String),
    #[error("connection failed: {0}")]
    Connectivity(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// What the user can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recourse {
    Retry,
    CorrectInput,
    Relogin,
    ContactSupport,
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Message suitable for an inline error or toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Please fill in all fields correctly.",
            Self::InvalidCredentials => "Invalid email or password.",
            Self::NotFound { .. } => "Resource not found.",
            Self::Unauthorized => "Session expired. Please sign in again.",
            Self::Forbidden(_) => "You do not have permission to perform this action.",
            Self::Connectivity(_) => "Connection error. Check your internet connection.",
            Self::Server { .. } => "Server error. Please try again later.",
            Self::Storage(_) | Self::Decode(_) => "An unexpected error occurred.",
        }
    }

    pub fn recourse(&self) -> Recourse {
        match self {
            Self::Validation(_) | Self::InvalidCredentials => Recourse::CorrectInput,
            Self::Unauthorized => Recourse::Relogin,
            Self::Connectivity(_) | Self::Server { .. } => Recourse::Retry,
            Self::NotFound { .. } | Self::Forbidden(_) | Self::Storage(_) | Self::Decode(_) => {
                Recourse::ContactSupport
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.recourse() == Recourse::Retry
    }

    /// Maps a non-success HTTP status and its `message` body to the taxonomy.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound {
                entity: "resource",
                id: message,
            },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
                Self::Validation(message)
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Self::Connectivity(message),
            other => Self::Server {
                status: other.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status, err.to_string())
        } else {
            // timeouts, refused connections, DNS, TLS
            Self::Connectivity(err.to_string())
        }
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for ClientError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

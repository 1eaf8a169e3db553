//! Error types for SafeSpace.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::onboarding::state::OnboardingStep;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Client-durable session storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from handing the finished draft to the onboarding service.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Onboarding service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Onboarding request rejected: {message}")]
    Rejected { message: String },

    #[error("Account already exists: {message}")]
    Conflict { message: String },

    #[error("Onboarding service failed with status {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Invalid response from onboarding service: {0}")]
    InvalidResponse(String),

    #[error("A submission is already in flight")]
    InFlight,

    #[error("Failed to store session identity: {0}")]
    Storage(#[from] StorageError),
}

impl SubmissionError {
    /// Whether pressing submit again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Service { .. }
        )
    }

    /// Text shown to the user on the completion step.
    pub fn user_message(&self) -> String {
        match self {
            Self::Conflict { .. } => {
                "An account with this email already exists. Try a different email.".to_string()
            }
            Self::Rejected { message } => format!("Please check your details: {message}"),
            Self::InFlight => "Your account is being created, hang tight.".to_string(),
            _ => "We couldn't create your account right now. Please try again.".to_string(),
        }
    }
}

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Client-side step validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Step {step} has {} invalid field(s): {}", issues.len(), render_issues(issues))]
pub struct ValidationError {
    pub step: OnboardingStep,
    pub issues: Vec<FieldIssue>,
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by the onboarding wizard.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Update from step {got} ignored, current step is {expected}")]
    StepMismatch {
        expected: OnboardingStep,
        got: OnboardingStep,
    },

    #[error("Onboarding already completed")]
    Closed,
}

/// HTTP-facing error, rendered as `{ "error": message }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} {id} not found"))
            }
            DatabaseError::Constraint(msg) => Self::Conflict(msg),
            other => {
                tracing::error!(error = %other, "Database failure while handling request");
                Self::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

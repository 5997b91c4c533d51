//! Error types for seller onboarding.

use crate::onboarding::model::FieldId;
use crate::onboarding::state::{StepPosition, WorkflowStatus};

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

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

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors produced at the remote service boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a usable response (timeout, connectivity,
    /// non-success HTTP status).
    #[error("{operation} request failed: {reason}")]
    Transport { operation: String, reason: String },

    /// The service answered but reported failure through its `status` flag.
    #[error("{operation} rejected: {message}")]
    Business { operation: String, message: String },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Cannot read media file {path}: {reason}")]
    Media { path: String, reason: String },
}

/// Local validation failure. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Step {position} is incomplete (missing: {}, invalid: {})", join_fields(.missing), join_fields(.invalid))]
pub struct ValidationError {
    pub position: StepPosition,
    pub missing: Vec<FieldId>,
    pub invalid: Vec<FieldId>,
}

fn join_fields(fields: &[FieldId]) -> String {
    if fields.is_empty() {
        return "none".to_string();
    }
    fields
        .iter()
        .map(|f| f.wire_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A persisted session that disagrees with the remote progress record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// A session exists locally but the service reports nothing completed.
    #[error("local session for store {store_id} has no remote progress")]
    StaleSession { store_id: String },

    /// The service reports completed steps but no session is stored locally.
    #[error("remote progress resumes at {resume_at} but no local session exists")]
    MissingSession { resume_at: StepPosition },
}

/// Errors surfaced by the onboarding workflow to its callers.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    RemoteBusiness { message: String },

    #[error("Could not reach the onboarding service, please retry ({reason})")]
    Transport { reason: String },

    #[error("Verification failed: {message}")]
    Verification { message: String },

    #[error("Onboarding state is inconsistent: {0}")]
    StateInconsistency(#[from] Inconsistency),

    #[error("Another onboarding request is still in flight")]
    SubmissionInFlight,

    #[error("Email verification must be completed before continuing")]
    AwaitingVerification,

    #[error("No verification code is pending")]
    NotAwaitingVerification,

    #[error("A new code can be requested in {remaining_secs}s")]
    ResendNotReady { remaining_secs: u32 },

    #[error("Onboarding progress has not been loaded; refresh before continuing")]
    ProgressUnknown,

    #[error("No onboarding session; the first step must be submitted again")]
    MissingSession,

    #[error("Onboarding is already {status}")]
    Finished { status: WorkflowStatus },

    #[error("Local storage failed: {0}")]
    Storage(#[from] DatabaseError),
}

impl From<ApiError> for StepError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Business { message, .. } => Self::RemoteBusiness { message },
            other => Self::Transport {
                reason: other.to_string(),
            },
        }
    }
}

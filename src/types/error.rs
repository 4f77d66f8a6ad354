//! Error types for Depot

use hyper::StatusCode;

/// Main error type for Depot operations
///
/// Every request failure maps to exactly one variant so callers (and tests)
/// can assert on error identity rather than on a message string.
#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    #[error("Amount must be a positive integer")]
    InvalidAmount,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Cannot contribute more than {remaining}")]
    OverContribution { remaining: u64 },

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Project already exists")]
    AlreadyExists,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DepotError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAmount => StatusCode::BAD_REQUEST,
            Self::ProjectNotFound => StatusCode::NOT_FOUND,
            Self::UnknownResource(_) => StatusCode::BAD_REQUEST,
            Self::OverContribution { .. } => StatusCode::BAD_REQUEST,
            Self::UnknownTemplate(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "invalid_amount",
            Self::ProjectNotFound => "project_not_found",
            Self::UnknownResource(_) => "unknown_resource",
            Self::OverContribution { .. } => "over_contribution",
            Self::UnknownTemplate(_) => "unknown_template",
            Self::AlreadyExists => "already_exists",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }

    /// Remaining capacity carried by over-contribution rejections
    pub fn remaining(&self) -> Option<u64> {
        match self {
            Self::OverContribution { remaining } => Some(*remaining),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DepotError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for DepotError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for Depot operations
pub type Result<T> = std::result::Result<T, DepotError>;

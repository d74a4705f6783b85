//! Error types for the CityFix core.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Caller Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot {action} a report in status '{status}'")]
    StateViolation {
        /// The attempted lifecycle action.
        action: String,
        /// The report's current status.
        status: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Upload Errors ===
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// User-initiated cancellation. Not a fault: the action unwinds to the
    /// state committed before it started.
    #[error("Upload cancelled")]
    UploadCancelled,

    // === Infrastructure Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a [`AppError::StateViolation`] from an action name and the
    /// report's current status.
    #[must_use]
    pub fn state_violation(action: &str, status: impl std::fmt::Display) -> Self {
        Self::StateViolation {
            action: action.to_string(),
            status: status.to_string(),
        }
    }

    /// Returns the error code for structured logging and client surfaces.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ReportNotFound(_) => "REPORT_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::StateViolation { .. } => "STATE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::UploadFailed(_) => "UPLOAD_FAILED",
            Self::UploadCancelled => "UPLOAD_CANCELLED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error indicates an infrastructure fault rather than a
    /// rejected user action.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Config(_)
                | Self::ExternalService(_)
                | Self::Internal(_)
                | Self::UploadFailed(_)
        )
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_violation_message() {
        let err = AppError::state_violation("verify", "submitted");
        assert_eq!(
            err.to_string(),
            "Cannot verify a report in status 'submitted'"
        );
        assert_eq!(err.error_code(), "STATE_VIOLATION");
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_upload_cancelled_is_not_server_error() {
        assert!(!AppError::UploadCancelled.is_server_error());
        assert!(AppError::UploadFailed("socket closed".to_string()).is_server_error());
    }
}

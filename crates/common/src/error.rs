//! Error types for liaison.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Caller Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced game, country or user could not be resolved.
    #[error("Resolution error: {0}")]
    Resolution(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code reported to callers.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Resolution(_) => "RESOLUTION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether the error was caused by the caller's request rather
    /// than by the service itself.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::PermissionDenied(_) | Self::Validation(_) | Self::Resolution(_)
        )
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Log the error at a level matching its origin.
    pub fn log(&self) {
        let code = self.error_code();
        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }
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
    fn test_client_errors() {
        assert!(AppError::PermissionDenied("update".into()).is_client_error());
        assert!(AppError::Validation("short".into()).is_client_error());
        assert!(AppError::Resolution("country 3".into()).is_client_error());
        assert!(AppError::NotFound("group 1".into()).is_client_error());
        assert!(AppError::Database("down".into()).is_server_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::PermissionDenied(String::new()).error_code(),
            "PERMISSION_DENIED"
        );
        assert_eq!(
            AppError::Resolution(String::new()).error_code(),
            "RESOLUTION_ERROR"
        );
    }

    #[test]
    fn test_display_names_operation() {
        let err = AppError::PermissionDenied("owner weighting update".to_string());
        assert_eq!(err.to_string(), "Permission denied: owner weighting update");
    }
}

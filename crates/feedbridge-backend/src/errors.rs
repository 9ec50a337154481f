//! Backend call failures.

use feedbridge_core::ErrorCategory;
use thiserror::Error;

/// Errors returned by [`crate::Backend`] calls.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend rejected the access token (HTTP 401).
    #[error("{0}")]
    Unauthorized(String),

    /// The requested resource does not exist or is not visible (HTTP 404).
    #[error("{0}")]
    NotFound(String),

    /// Any other non-success response. Carries the backend's message.
    #[error("{0}")]
    Other(String),

    /// Connect, timeout or other transport failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Failure category for logging and reply selection.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized(_) => ErrorCategory::Unauthorized,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Other(_) => ErrorCategory::BackendOther,
            Self::Transport(_) => ErrorCategory::TransientNetwork,
            Self::Decode(_) => ErrorCategory::DecodeFailure,
        }
    }

    /// Whether this is an authentication failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether this is a not-found failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience type alias for backend results.
pub type Result<T> = std::result::Result<T, BackendError>;

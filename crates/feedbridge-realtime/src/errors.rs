//! Realtime bridge errors.

use feedbridge_backend::BackendError;
use feedbridge_core::{ErrorCategory, UserId};
use feedbridge_session::StoreError;
use thiserror::Error;

/// Failures while connecting or projecting push events.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Push socket connect or I/O failure.
    #[error("push socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame or event payload did not have the expected shape.
    #[error("decode failure: {0}")]
    Decode(String),

    /// The session lost its credential before the event was processed.
    #[error("session {0} is no longer authorized")]
    StaleState(UserId),

    /// A backend call made while projecting an event failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The session store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RealtimeError {
    /// Failure category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Socket(_) => ErrorCategory::TransientNetwork,
            Self::Decode(_) => ErrorCategory::DecodeFailure,
            Self::StaleState(_) => ErrorCategory::StaleState,
            Self::Backend(e) => e.category(),
            Self::Store(e) => e.category(),
        }
    }
}

/// Convenience type alias for realtime results.
pub type Result<T> = std::result::Result<T, RealtimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(
            RealtimeError::Decode("x".into()).category(),
            ErrorCategory::DecodeFailure
        );
        assert_eq!(
            RealtimeError::StaleState(UserId::new(1)).category(),
            ErrorCategory::StaleState
        );
        assert_eq!(
            RealtimeError::Backend(BackendError::NotFound("p".into())).category(),
            ErrorCategory::NotFound
        );
    }

    #[test]
    fn stale_state_display() {
        assert_eq!(
            RealtimeError::StaleState(UserId::new(42)).to_string(),
            "session 42 is no longer authorized"
        );
    }
}

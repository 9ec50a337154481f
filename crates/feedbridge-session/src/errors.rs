//! Error types for session transitions and persistence.

use feedbridge_core::ErrorCategory;
use thiserror::Error;

/// A transition that the current session state does not allow.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The transition needs a verified credential.
    #[error("session is not authorized")]
    NotAuthorized,
    /// An addressee name was empty.
    #[error("addressee name is empty")]
    EmptyAddressee,
}

impl TransitionError {
    /// Failure category for logging and reply selection.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotAuthorized => ErrorCategory::Unauthorized,
            Self::EmptyAddressee => ErrorCategory::BackendOther,
        }
    }
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem error while preparing the database location.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },
}

impl StoreError {
    /// Storage failures are reported to the user as generic failures.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::BackendOther
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_error_display() {
        let err = StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().contains("sqlite error"));
        assert_eq!(err.category(), ErrorCategory::BackendOther);
    }

    #[test]
    fn migration_error_display() {
        let err = StoreError::Migration {
            message: "v1 failed".into(),
        };
        assert_eq!(err.to_string(), "migration error: v1 failed");
    }

    #[test]
    fn transition_categories() {
        assert_eq!(
            TransitionError::NotAuthorized.category(),
            ErrorCategory::Unauthorized
        );
    }
}

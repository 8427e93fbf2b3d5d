//! Error types for the Spender client library.

use core::fmt;

use crate::models::{TransactionId, ValidationError};

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SpenderError>;

/// Backend operation whose failure is reported as a [`SpenderError::Sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Listing transactions for a scope.
    FetchTransactions,
    /// Creating a transaction.
    AddTransaction,
    /// Updating a transaction.
    UpdateTransaction,
    /// Deleting a transaction.
    DeleteTransaction,
    /// Fetching the category breakdown for a scope.
    FetchDashboard,
}

impl fmt::Display for Operation {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match *self {
            Self::FetchTransactions => "fetch transactions",
            Self::AddTransaction => "add transactions",
            Self::UpdateTransaction => "update transactions",
            Self::DeleteTransaction => "delete transactions",
            Self::FetchDashboard => "fetch dashboard data",
        };
        f.write_str(text)
    }
}

/// All errors that can occur when using the Spender client.
#[derive(Debug, thiserror::Error)]
pub enum SpenderError {
    /// User input was rejected before any network call.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// A backend call failed; local state was left untouched.
    #[error("failed to {operation}")]
    Sync {
        /// Operation that failed.
        operation: Operation,
        /// Underlying transport or server error.
        #[source]
        source: Box<SpenderError>,
    },

    /// The targeted transaction is not part of the current collection.
    #[error("transaction {0} not found")]
    NotFound(TransactionId),

    /// The server rejected the caller's identity; the user must sign in again.
    #[error("authentication failed: {message}")]
    Auth {
        /// Server-provided reason.
        message: String,
    },

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured base URL could not be parsed.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// Session storage backend failed.
    #[error("session storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// A create submission is already in flight for this form.
    #[error("a submission is already in progress")]
    DuplicateSubmission,

    /// A scoped operation was attempted without an active session.
    #[error("no active session; sign in first")]
    NotLoggedIn,
}

impl SpenderError {
    /// Wraps a transport error as a [`SpenderError::Sync`] for `operation`.
    ///
    /// Authentication, not-found and validation errors pass through
    /// unchanged: they carry their own recovery path.
    #[must_use]
    pub(crate) fn into_sync(self, operation: Operation) -> Self {
        match self {
            Self::Http(_) | Self::Api { .. } | Self::Serialization(_) => Self::Sync {
                operation,
                source: Box::new(self),
            },
            Self::Validation(_)
            | Self::Sync { .. }
            | Self::NotFound(_)
            | Self::Auth { .. }
            | Self::InvalidBaseUrl(_)
            | Self::Storage(_)
            | Self::DuplicateSubmission
            | Self::NotLoggedIn => self,
        }
    }

    /// Returns `true` if this error means the session must be re-established.
    #[inline]
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(*self, Self::Auth { .. } | Self::NotLoggedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = SpenderError::from(serde_err);
        assert!(matches!(err, SpenderError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn sync_error_uses_scoped_message() {
        let err = SpenderError::Api {
            status: 500,
            message: "boom".to_owned(),
        }
        .into_sync(Operation::FetchTransactions);
        assert_eq!(err.to_string(), "failed to fetch transactions");
        let source = core::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("boom"));
    }

    #[test]
    fn mutation_messages_match_fetch_wording() {
        let messages: Vec<String> = [
            Operation::AddTransaction,
            Operation::UpdateTransaction,
            Operation::DeleteTransaction,
        ]
        .into_iter()
        .map(|operation| {
            SpenderError::Api {
                status: 503,
                message: String::new(),
            }
            .into_sync(operation)
            .to_string()
        })
        .collect();
        assert_eq!(
            messages,
            [
                "failed to add transactions",
                "failed to update transactions",
                "failed to delete transactions",
            ]
        );
    }

    #[test]
    fn into_sync_keeps_auth_and_not_found() {
        let auth = SpenderError::Auth {
            message: "expired".to_owned(),
        }
        .into_sync(Operation::DeleteTransaction);
        assert!(auth.requires_login());

        let missing = SpenderError::NotFound(TransactionId::new(7))
            .into_sync(Operation::UpdateTransaction);
        assert!(matches!(missing, SpenderError::NotFound(id) if id.get() == 7));
    }

    #[test]
    fn validation_error_display() {
        let err = SpenderError::from(ValidationError::EmptyName);
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn error_storage_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = SpenderError::Storage(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("session storage error"));
        assert!(msg.contains("file missing"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SpenderError>();
    }
}

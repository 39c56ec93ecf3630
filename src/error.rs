//! Error types for the inventory storage core
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Every operation of the storage layer returns [`Result<T>`], and every failure
//! carries a machine-distinguishable [`ErrorKind`] plus a human-readable message
//! that is safe to show to an end user.
//!
//! ## Taxonomy
//!
//! - `UniqueConflict` - a uniqueness constraint was violated (recoverable)
//! - `ReferentialConflict` - a foreign key blocked a delete/update (recoverable)
//! - `CapacityExceeded` - a table reached its configured ceiling (recoverable)
//! - `EmptyLinkSet` - a book would be left without authors/genres (recoverable)
//! - `NotFound` - the addressed row does not exist
//! - `InvalidInput` - arguments rejected before they reach storage
//! - `Fatal` - any unclassified storage failure; details stay in the log
//!
//! Driver errors are translated in `storage::executor`, which is the only place
//! that looks at driver error codes.

use thiserror::Error;

/// Result type alias using our StoreError type
pub type Result<T> = std::result::Result<T, StoreError>;

/// Coarse category of a [`StoreError`], used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The write collides with existing data or limits (HTTP 409)
    Conflict,
    /// The addressed row does not exist (HTTP 404)
    NotFound,
    /// The caller passed arguments the store refuses to coerce (HTTP 400)
    Invalid,
    /// Unrecoverable storage failure (HTTP 500)
    Fatal,
}

/// Main error type for the storage core
#[derive(Error, Debug)]
pub enum StoreError {
    // ===== Conflicts =====

    /// A unique constraint was violated
    #[error("{message}")]
    UniqueConflict {
        message: String,
        /// Column(s) named by the constraint detail, if the driver reported them
        columns: Vec<String>,
    },

    /// A foreign key constraint blocked the statement
    #[error("{message}")]
    ReferentialConflict { message: String },

    /// The table already holds its configured maximum number of rows
    #[error("Table '{table}' reached its limit of {ceiling} rows")]
    CapacityExceeded { table: String, ceiling: u64 },

    /// A link replacement would leave the book without any links
    #[error("A book must retain at least one {relation}")]
    EmptyLinkSet { relation: String },

    // ===== Lookups =====

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    // ===== Input =====

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ===== Fatal =====

    /// Unclassified storage failure. The message is generic on purpose; the
    /// full driver error is logged where it was classified.
    #[error("{0}")]
    Fatal(String),

    /// File system failure while preparing the database location
    #[error("File I/O error: {0}")]
    FileIoError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        crate::storage::executor::classify(&err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::InvalidConfiguration(format!("JSON error: {}", err))
    }
}

// Helper methods for creating common errors
impl StoreError {
    /// Create a NotFound error with a resource name
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        StoreError::NotFound(resource.into())
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        StoreError::InvalidInput(message.into())
    }

    /// Create a Fatal error with a message
    pub fn fatal<S: Into<String>>(message: S) -> Self {
        StoreError::Fatal(message.into())
    }

    /// Create an EmptyLinkSet error for the given relation ("author", "genre")
    pub fn empty_link_set<S: Into<String>>(relation: S) -> Self {
        StoreError::EmptyLinkSet {
            relation: relation.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::UniqueConflict { .. }
            | StoreError::ReferentialConflict { .. }
            | StoreError::CapacityExceeded { .. }
            | StoreError::EmptyLinkSet { .. } => ErrorKind::Conflict,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidInput(_) | StoreError::InvalidConfiguration(_) => {
                ErrorKind::Invalid
            }
            StoreError::Fatal(_) | StoreError::FileIoError(_) => ErrorKind::Fatal,
        }
    }

    /// HTTP status equivalent of this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Conflict => 409,
            ErrorKind::NotFound => 404,
            ErrorKind::Invalid => 400,
            ErrorKind::Fatal => 500,
        }
    }

    /// Check if the caller can recover from this error (fix input and retry)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Fatal)
    }

    /// Check if error is a storage constraint conflict
    pub fn is_constraint_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::UniqueConflict { .. } | StoreError::ReferentialConflict { .. }
        )
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            StoreError::CapacityExceeded { table, .. } => {
                format!("No more {} can be added, the inventory is full.", table)
            }
            StoreError::Fatal(_) | StoreError::FileIoError(_) => {
                "Mission failed! Try again later.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_status_codes() {
        let conflict = StoreError::CapacityExceeded {
            table: "books".to_string(),
            ceiling: 10,
        };
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(conflict.status_code(), 409);
        assert!(conflict.is_recoverable());

        assert_eq!(StoreError::not_found("book 3").status_code(), 404);
        assert_eq!(StoreError::invalid_input("bad isbn").status_code(), 400);

        let fatal = StoreError::fatal("boom");
        assert_eq!(fatal.kind(), ErrorKind::Fatal);
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn test_fatal_user_message_is_generic() {
        let err = StoreError::fatal("disk I/O error at page 17");
        assert!(!err.user_message().contains("page 17"));
    }

    #[test]
    fn test_empty_link_set_message() {
        let err = StoreError::empty_link_set("author");
        assert_eq!(err.to_string(), "A book must retain at least one author");
        assert!(!err.is_constraint_conflict());
    }
}

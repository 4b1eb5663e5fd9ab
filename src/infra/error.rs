//! Error types for the agrichain ledger

use thiserror::Error;

/// Errors surfaced by ledger operations and their storage
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Referenced batch or user does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller lacks the required role or ownership
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed or out-of-range argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Duplicate batch id or user registration
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Lifecycle rule forbids the change
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Batch writes are suspended
    #[error("ledger is paused")]
    Paused,

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Event (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Journal content failed an integrity check during replay
    #[error("journal corrupted at sequence {sequence}: {reason}")]
    JournalCorrupted { sequence: u64, reason: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn invalid_transition(reason: impl Into<String>) -> Self {
        Self::InvalidStateTransition(reason.into())
    }

    /// Stable short name used in logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Unauthorized(_) => "unauthorized",
            LedgerError::InvalidInput(_) => "invalid_input",
            LedgerError::AlreadyExists(_) => "already_exists",
            LedgerError::InvalidStateTransition(_) => "invalid_state_transition",
            LedgerError::Paused => "paused",
            LedgerError::Database(_) => "database",
            LedgerError::Serialization(_) => "serialization",
            LedgerError::JournalCorrupted { .. } => "journal_corrupted",
            LedgerError::Configuration(_) => "configuration",
            LedgerError::Internal(_) => "internal",
        }
    }

    /// Whether the caller caused the failure (as opposed to storage or bugs)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::NotFound(_)
                | LedgerError::Unauthorized(_)
                | LedgerError::InvalidInput(_)
                | LedgerError::AlreadyExists(_)
                | LedgerError::InvalidStateTransition(_)
                | LedgerError::Paused
        )
    }
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

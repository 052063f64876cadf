use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Store-level errors (queries, constraints)
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Amount was zero or negative
    #[error("Invalid amount: {0} (amount must be positive)")]
    InvalidAmount(i64),

    /// Debit exceeds the spendable balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Account lookup failed with auto-provisioning disabled
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Sender and receiver of a transfer are the same account
    #[error("Cannot transfer to the same account: {0}")]
    SelfTransfer(String),

    /// Transfer credit leg failed and the sender was refunded
    #[error("Transfer failed and was rolled back: {0}")]
    TransferRolledBack(String),

    /// Transfer credit leg failed AND the compensating refund failed.
    /// The sender has been debited with no matching credit anywhere;
    /// requires manual reconciliation.
    #[error("Transfer failed and could not be rolled back: {0}")]
    TransferUnrecoverable(String),

    /// Store call exceeded its deadline
    #[error("Operation timed out")]
    Timeout,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for ledger errors
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Check if error is a database connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            LedgerError::Database(DatabaseError::PoolCreation(_))
                | LedgerError::Database(DatabaseError::ConnectionTimeout)
                | LedgerError::Timeout
        )
    }

    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::AccountNotFound(_))
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount(_) => 400,
            LedgerError::InsufficientBalance { .. } => 400,
            LedgerError::SelfTransfer(_) => 400,
            LedgerError::AccountNotFound(_) => 404,
            LedgerError::TransferRolledBack(_) => 500,
            LedgerError::TransferUnrecoverable(_) => 500,
            LedgerError::Timeout => 504,
            LedgerError::Config(_) => 500,
            LedgerError::Database(_) | LedgerError::Store(_) => 500,
            _ => 500,
        }
    }
}

/// Store-specific error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation (check or foreign key)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Debit would drive the balance negative
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Pool acquisition deadline exceeded
    #[error("Store operation timed out")]
    Timeout,
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => LedgerError::AccountNotFound(msg),
            StoreError::InsufficientBalance {
                available,
                required,
            } => LedgerError::InsufficientBalance {
                available,
                required,
            },
            StoreError::Timeout => LedgerError::Timeout,
            other => LedgerError::Store(other),
        }
    }
}

impl From<SqlxError> for StoreError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            SqlxError::PoolTimedOut => StoreError::Timeout,
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                if code.as_deref() == Some("23505") {
                    // Unique violation
                    StoreError::Duplicate(db_err.message().to_string())
                } else if code.as_deref() == Some("23503") {
                    // Foreign key violation
                    StoreError::ConstraintViolation(db_err.message().to_string())
                } else if code.as_deref() == Some("23514") {
                    // Check constraint violation
                    StoreError::ConstraintViolation(db_err.message().to_string())
                } else {
                    StoreError::Query(err)
                }
            }
            _ => StoreError::Query(err),
        }
    }
}

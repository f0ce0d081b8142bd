//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Expected conditions
//! (not found, duplicates, rejected amounts, insufficient provision) are ordinary
//! variants the caller can react to; [`Error::InvariantViolation`] marks a defect.

use rust_decimal::Decimal;
use sea_orm::{DbErr, SqlErr};
use std::fmt;
use thiserror::Error;

/// Kind of resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A registered user
    User,
    /// A bank account owned by a user
    BankAccount,
    /// A connection edge between two users
    Connection,
    /// A user email address
    Email,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::BankAccount => "bank account",
            Self::Connection => "connection",
            Self::Email => "email",
        };
        f.write_str(name)
    }
}

/// Coarse classification used by the request layer to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced entity does not exist
    NotFound,
    /// The entity already exists, or a concurrent write won
    Conflict,
    /// The input was rejected (bad amount, bad configuration)
    RejectedInput,
    /// The operation is not allowed in the current state
    Forbidden,
    /// Storage failure or broken invariant
    Fatal,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced entity does not exist
    #[error("This {resource} is not found: {id}")]
    ResourceNotFound {
        /// Kind of the missing entity
        resource: Resource,
        /// Identifier that was looked up
        id: String,
    },

    /// An add would duplicate an existing entity
    #[error("This {resource} already exists: {key}")]
    ResourceAlreadyExists {
        /// Kind of the duplicated entity
        resource: Resource,
        /// Key that collided (email, IBAN, ...)
        key: String,
    },

    /// Amount is not positive, has more than two decimals or overflows
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// A debit would make the balance negative
    #[error("Insufficient provision to debit {required} from balance {balance}")]
    InsufficientProvision {
        /// Balance before the debit
        balance: Decimal,
        /// Amount the debit asked for
        required: Decimal,
    },

    /// A credit would raise the balance above the configured ceiling
    #[error("Crediting {amount} would exceed the balance ceiling {ceiling} (balance {balance})")]
    ExceedingBalanceCeiling {
        /// Balance before the credit
        balance: Decimal,
        /// Amount to credit
        amount: Decimal,
        /// Configured ceiling
        ceiling: Decimal,
    },

    /// The request is well-formed but not allowed
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Why the operation was refused
        reason: String,
    },

    /// A balance changed between load and save
    #[error("The {resource} {id} was modified concurrently")]
    ConcurrentModification {
        /// Kind of the contended entity
        resource: Resource,
        /// Its id
        id: i64,
    },

    /// Persisted state breaks a ledger invariant; a defect, never repaired
    #[error("Ledger invariant violated: {message}")]
    InvariantViolation {
        /// What was found
        message: String,
    },

    /// Configuration could not be read or is out of range
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    pub(crate) fn not_found(resource: Resource, id: impl ToString) -> Self {
        Self::ResourceNotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(resource: Resource, key: impl ToString) -> Self {
        Self::ResourceAlreadyExists {
            resource,
            key: key.to_string(),
        }
    }

    /// Maps a unique-constraint failure on insert or update to `ResourceAlreadyExists`.
    ///
    /// Covers the race where two writers both pass the existence check; any other
    /// database error is kept as is.
    pub(crate) fn from_unique_violation(err: DbErr, resource: Resource, key: impl ToString) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::already_exists(resource, key),
            _ => Self::Database(err),
        }
    }

    pub(crate) fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Classifies the error for the surrounding request layer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ResourceNotFound { .. } => ErrorKind::NotFound,
            Self::ResourceAlreadyExists { .. } | Self::ConcurrentModification { .. } => {
                ErrorKind::Conflict
            }
            Self::InvalidAmount { .. } | Self::Config { .. } => ErrorKind::RejectedInput,
            Self::InsufficientProvision { .. }
            | Self::ExceedingBalanceCeiling { .. }
            | Self::InvalidOperation { .. } => ErrorKind::Forbidden,
            Self::InvariantViolation { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_) => ErrorKind::Fatal,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

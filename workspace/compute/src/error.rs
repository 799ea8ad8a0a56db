use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::debug;

/// Error types for the attendance workflow
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A referenced row does not exist (or exists with another role)
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// The caller passed the coarse role check but may not touch this resource
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// A field failed a constraint
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unique value is already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown user, wrong password or unapproved account. Deliberately one variant.
    #[error("Invalid credentials or account not approved yet.")]
    InvalidCredentials,

    /// Error from the password hasher
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl ComputeError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        ComputeError::NotFound { entity, id }
    }

    /// Maps unique constraint violations to `Conflict`, everything else to `Database`.
    pub fn from_write(error: DbErr, conflict: impl FnOnce() -> String) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                debug!("Unique constraint violated: {}", detail);
                ComputeError::Conflict(conflict())
            }
            _ => ComputeError::Database(error),
        }
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;

//! Custom error types for the common library
//!
//! This module defines the error type returned by the database handle and
//! every data access operation, whichever store backs it.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A uniqueness invariant would be violated by the write
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A stored document could not be converted to or from its model
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DatabaseError {
    /// Classify a query failure, turning unique index violations into
    /// [`DatabaseError::DuplicateKey`].
    pub fn from_query(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique index").to_string();
                return DatabaseError::DuplicateKey(constraint);
            }
        }

        DatabaseError::Query(err)
    }

    /// Whether the error reports a uniqueness violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DatabaseError::DuplicateKey(_))
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::Query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_a_query_error() {
        let err = DatabaseError::from_query(SqlxError::RowNotFound);
        assert!(matches!(err, DatabaseError::Query(_)));
        assert!(!err.is_duplicate_key());
    }

    #[test]
    fn test_duplicate_key_message() {
        let err = DatabaseError::DuplicateKey("albums_lower_name_key".to_string());
        assert!(err.is_duplicate_key());
        assert_eq!(err.to_string(), "Duplicate key: albums_lower_name_key");
    }
}

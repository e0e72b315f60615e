use thiserror::Error;

/// Errors that can occur when executing statements through the gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A result column was missing or carried an unexpected type.
    #[error("Column '{column}' missing or of unexpected type")]
    Decode { column: String },

    /// The engine refused the statement outright.
    #[error("Statement rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Creates a decode error for the given column name.
    pub fn decode(column: impl Into<String>) -> Self {
        StoreError::Decode {
            column: column.into(),
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, StoreError>;

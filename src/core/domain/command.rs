use thiserror::Error;

use crate::core::domain::transaction::TransactionError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Entity already exists: {entity_type} - {details}")]
    AlreadyExists {
        entity_type: String,
        details: String,
    },

    #[error("Concurrent modification detected: {entity_type}")]
    ConcurrencyError { entity_type: String },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CommandError {
    pub fn already_exists(entity_type: &str, id: i32) -> Self {
        CommandError::AlreadyExists {
            entity_type: entity_type.to_string(),
            details: format!("id: {}", id),
        }
    }

    /// Maps a driver failure for `entity_type` onto a domain error.
    pub fn from_transaction_error(
        entity_type: &str,
        id: i32,
        error: TransactionError,
    ) -> Self {
        let message = error.to_string();
        if message.contains("unique constraint") {
            CommandError::already_exists(entity_type, id)
        } else if message.contains("deadlock") {
            CommandError::ConcurrencyError {
                entity_type: entity_type.to_string(),
            }
        } else {
            CommandError::DatabaseError(message)
        }
    }
}

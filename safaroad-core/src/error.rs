//! Error types for the Safaroad state engine
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the presentation layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Incident not found: {0}")]
    IncidentNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// True for errors raised because a single-target operation referenced a missing id
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::IncidentNotFound(_) | AppError::UserNotFound(_))
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

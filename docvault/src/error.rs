//! Error types for docvault
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the UI layer as plain messages.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rejected input; the message is meant to be shown to the user as-is.
    #[error("{0}")]
    Validation(String),

    /// The remote service answered but reported failure.
    #[error("{0}")]
    Remote(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid OTP. Please try again.")]
    InvalidOtp,

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout(_) => true,
            AppError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
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

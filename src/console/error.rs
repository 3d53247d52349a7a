//! # Console API Errors
//!
//! Classification of GraphQL and HTTP failures.

use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// The object does not exist
    #[error("{0}")]
    NotFound(String),

    /// The create conflicted with an object using the same natural key
    #[error("{0}")]
    AlreadyExists(String),

    /// The delete is blocked until dependent objects go away
    #[error("deletion pending: {0}")]
    DeletionPending(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network failures, 5xx and rate limiting
    #[error("transient Console API error: {0}")]
    Transient(String),

    #[error("Console API call timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to decode Console API response: {0}")]
    Decode(String),

    #[error("Console API error: {0}")]
    Api(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    pub fn is_deletion_pending(&self) -> bool {
        matches!(self, Self::DeletionPending(_))
    }

    /// Classify a GraphQL error message
    pub fn from_graphql_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("could not find resource") || lower.contains("not found") {
            Self::NotFound(message.to_string())
        } else if lower.contains("has already been taken") || lower.contains("already exists") {
            Self::AlreadyExists(message.to_string())
        } else if lower.contains("still in use") || lower.contains("has dependent") {
            Self::DeletionPending(message.to_string())
        } else if lower.contains("forbidden") || lower.contains("unauthorized") {
            Self::Unauthorized(message.to_string())
        } else {
            Self::Api(message.to_string())
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", body.trim());
        match status.as_u16() {
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            408 | 429 | 500..=599 => Self::Transient(message),
            _ => Self::Api(message),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::Transient(e.to_string())
        } else {
            Self::Api(e.to_string())
        }
    }
}

//! Typed failure kinds.
//!
//! Application flow uses `anyhow`; these enums cover the failures that
//! callers inspect or report per item.

use thiserror::Error;

/// Failure talking to the upstream forum API.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Unexpected status {status_code} for {endpoint}")]
    UnexpectedStatus { status_code: u16, endpoint: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SourceError {
    /// Map a non-success HTTP status to an error kind.
    pub fn from_status(status_code: u16, endpoint: &str, retry_after: Option<u64>) -> Self {
        match status_code {
            401 => SourceError::AuthenticationFailed {
                reason: format!("unauthorized for {}", endpoint),
            },
            403 => SourceError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => SourceError::NotFound {
                resource: endpoint.to_string(),
            },
            429 => SourceError::RateLimited {
                retry_after: retry_after.unwrap_or(60),
            },
            500..=599 => SourceError::ServerError { status_code },
            _ => SourceError::UnexpectedStatus {
                status_code,
                endpoint: endpoint.to_string(),
            },
        }
    }
}

/// Rejected chart request.
#[derive(Error, Debug, PartialEq)]
pub enum RenderError {
    #[error("Subreddits not found in subs file: {}", .0.join(", "))]
    UnknownForums(Vec<String>),
}

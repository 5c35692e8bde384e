//! # Design
//!
//! - One error type for every call made against the status service.
//! - Keep `Display` messages constant; carry the operation and URL as fields.
//! - `detail()` renders a one-line description for empty states in the UI.

use thiserror::Error;

/// Result alias for status service operations.
pub type StatusResult<T> = Result<T, StatusError>;

/// Errors raised while talking to the status service.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The configured base URL could not be parsed or joined.
    #[error("invalid status service url")]
    InvalidUrl {
        /// Offending URL or path.
        value: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// Building the HTTP client failed.
    #[error("failed to build http client")]
    Client {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The request could not be sent or the body could not be read.
    #[error("http operation failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("http response status error")]
    HttpStatus {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode response body")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl StatusError {
    /// Operation that failed, when the error is tied to a request.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Http { operation, .. }
            | Self::HttpStatus { operation, .. }
            | Self::Decode { operation, .. } => Some(*operation),
            Self::InvalidUrl { .. } | Self::Client { .. } => None,
        }
    }

    /// Human-readable summary suitable for an empty-state message.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidUrl { value, .. } => format!("invalid status service url '{value}'"),
            Self::Client { source } => format!("failed to build http client: {source}"),
            Self::Http { url, source, .. } => format!("request to {url} failed: {source}"),
            Self::HttpStatus { url, status, .. } => format!("{url} returned status {status}"),
            Self::Decode { url, source, .. } => {
                format!("unexpected response from {url}: {source}")
            }
        }
    }
}

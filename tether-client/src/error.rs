//! Error types for the Tether clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the hub or the origin
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection refused, reset, timeout, body error)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Response body was not the JSON we expected
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The call was aborted through its cancellation token
    #[error("Request aborted")]
    Aborted,
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error came from an explicit abort
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/*!
 * Error types for the polysub application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to a translation backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call was cancelled before a response arrived
    #[error("Request cancelled")]
    Cancelled,

    /// A batch call returned a different number of lines than it was given
    #[error("Batch response mismatch: expected {expected} lines, got {actual}")]
    BatchMismatch {
        /// Number of lines submitted
        expected: usize,
        /// Number of lines the backend returned
        actual: usize,
    },
}

impl ProviderError {
    /// Whether a retry inside the provider's own budget makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::ConnectionError(_) | ProviderError::RateLimitExceeded(_)
        ) || matches!(self, ProviderError::ApiError { status_code, .. } if *status_code >= 500)
    }
}

/// Failure of one translation job execution, tagged by the stage it arose in.
///
/// Every variant resolves to a terminal `failed` status on the request; the
/// orchestrator never lets one of these escape `execute`.
#[derive(Error, Debug)]
pub enum JobError {
    /// Unknown service name, unusable settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Source unreadable or destination unwritable
    #[error("I/O error: {0}")]
    Io(String),

    /// Backend failure surfaced after the adapter's own retry budget
    #[error("backend error: {0}")]
    Backend(#[from] ProviderError),

    /// Translated content failed validation policy
    #[error("validation failed: {0}")]
    Validation(String),

    /// Cooperative cancellation observed between units
    #[error("translation cancelled")]
    Cancelled,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a translation backend
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a translation job
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

use thiserror::Error;

use crate::attempt::RequestAttempt;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the search client
///
/// Every failure, whether it came from a host, from the caller's input or from
/// local key derivation, is reported through this single type. Callers branch
/// on [`Error::kind`] or [`Error::status_code`] instead of matching variants.
#[derive(Error, Debug)]
pub enum Error {
    /// The service rejected the request (HTTP 4xx); never retried
    #[error("Application error ({status}): {message}")]
    Application { status: u16, message: String },

    /// Connection-level failure on one host (DNS, refused, reset)
    #[error("Host {host} unreachable: {message}")]
    TransientHost { host: String, message: String },

    /// The attempt exceeded its time budget
    #[error("Host {host} timed out after {after_ms}ms")]
    Timeout { host: String, after_ms: u64 },

    /// Server-side fault (HTTP 5xx or unexpected status)
    #[error("Service error from {host} ({status}): {message}")]
    Service { host: String, status: u16, message: String },

    /// A success status whose body was not valid JSON
    #[error("Invalid response from {host}: {message}")]
    InvalidResponse { host: String, message: String },

    /// Every candidate host failed
    #[error("All {} hosts failed, last error: {last}", .attempts.len())]
    Exhausted { attempts: Vec<RequestAttempt>, last: Box<Error> },

    /// Restrictions could not be turned into a secured API key
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization errors
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Application,
    TransientHost,
    Service,
    Exhausted,
    KeyGeneration,
    Config,
    Internal,
}

impl Error {
    /// HTTP status code associated with this error, when one was observed
    ///
    /// For [`Error::Exhausted`] this is the status of the final attempt.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Application { status, .. } => Some(*status),
            Error::Service { status, .. } => Some(*status),
            Error::Exhausted { last, .. } => last.status_code(),
            _ => None,
        }
    }

    /// Get error code for client consumption
    pub fn error_code(&self) -> &str {
        match self {
            Error::Application { .. } => "APPLICATION_ERROR",
            Error::TransientHost { .. } => "HOST_UNREACHABLE",
            Error::Timeout { .. } => "HOST_TIMEOUT",
            Error::Service { .. } => "SERVICE_ERROR",
            Error::InvalidResponse { .. } => "INVALID_RESPONSE",
            Error::Exhausted { .. } => "HOSTS_EXHAUSTED",
            Error::KeyGeneration(_) => "KEY_GENERATION_ERROR",
            Error::Config(_) => "CONFIGURATION_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Application { .. } => ErrorKind::Application,
            Error::TransientHost { .. } | Error::Timeout { .. } => ErrorKind::TransientHost,
            Error::Service { .. } | Error::InvalidResponse { .. } => ErrorKind::Service,
            Error::Exhausted { .. } => ErrorKind::Exhausted,
            Error::KeyGeneration(_) => ErrorKind::KeyGeneration,
            Error::Config(_) => ErrorKind::Config,
            Error::Serialization(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Whether the executor may move on to the next host after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientHost | ErrorKind::Service)
    }
}

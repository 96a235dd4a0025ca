//! Per-host attempt records

use std::{fmt, time::Duration};

/// One try of a logical call against one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAttempt {
    /// Host the request was sent to
    pub host: String,
    /// Time budget granted to this attempt (connect + read timeout)
    pub budget: Duration,
    /// Wall-clock time the attempt actually took
    pub elapsed: Duration,
    /// How the attempt ended
    pub outcome: AttemptOutcome,
}

/// Outcome of a single [`RequestAttempt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx with a JSON body
    Success { status: u16 },
    /// Transport-level failure before a response was read
    NetworkError { message: String },
    /// The attempt ran out of its budget
    Timeout,
    /// 4xx, terminal for the whole call
    ClientError { status: u16 },
    /// 5xx or another non-success status
    ServerError { status: u16 },
    /// 2xx whose body could not be decoded
    InvalidBody { message: String },
}

impl AttemptOutcome {
    /// Whether the executor continues with the next host after this outcome
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AttemptOutcome::Success { .. } | AttemptOutcome::ClientError { .. })
    }

    /// Short label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success { .. } => "success",
            AttemptOutcome::NetworkError { .. } => "network_error",
            AttemptOutcome::Timeout => "timeout",
            AttemptOutcome::ClientError { .. } => "client_error",
            AttemptOutcome::ServerError { .. } => "server_error",
            AttemptOutcome::InvalidBody { .. } => "invalid_body",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success { status } => write!(f, "success ({})", status),
            AttemptOutcome::NetworkError { message } => write!(f, "network error: {}", message),
            AttemptOutcome::Timeout => write!(f, "timeout"),
            AttemptOutcome::ClientError { status } => write!(f, "client error ({})", status),
            AttemptOutcome::ServerError { status } => write!(f, "server error ({})", status),
            AttemptOutcome::InvalidBody { message } => write!(f, "invalid body: {}", message),
        }
    }
}

impl fmt::Display for RequestAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} in {}ms", self.host, self.outcome, self.elapsed.as_millis())
    }
}

//! # Algolia Search Types
//!
//! Shared type definitions for the Algolia search client.
//!
//! This crate holds the pieces every other crate agrees on: the single error
//! type callers see, the per-host attempt record, and the traffic kind used to
//! pick hosts and timeouts.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Error Types
// ============================================================================

pub mod error;

pub use error::{Error, ErrorKind, Result};

// ============================================================================
// Attempt Records
// ============================================================================

pub mod attempt;

pub use attempt::{AttemptOutcome, RequestAttempt};

// ============================================================================
// Traffic Kind
// ============================================================================

/// Classification of an API call, used to select host list and timeout profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrafficKind {
    /// Search, listing, object retrieval
    #[default]
    Read,
    /// Indexing, settings, deletion, batches
    Write,
}

impl TrafficKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficKind::Read => "read",
            TrafficKind::Write => "write",
        }
    }
}

impl fmt::Display for TrafficKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

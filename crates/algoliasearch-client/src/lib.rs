//! Algolia search client
//!
//! This crate provides a resilient HTTP client for the Algolia search API and
//! local derivation of secured API keys:
//!
//! - Ordered host failover per traffic kind (read or write)
//! - Terminal handling of client errors (4xx), failover on everything else
//! - Per-attempt timeouts and full attempt history on exhaustion
//! - Optional demotion of repeatedly failing hosts
//! - Secured API key generation, decoding and verification

pub mod client;
pub mod config;
pub mod executor;
pub mod index;
pub mod logging;
pub mod metrics;
pub mod secured_key;
pub mod transport;

pub use algoliasearch_types::{Error, ErrorKind, Result, TrafficKind};
pub use client::Client;
pub use config::{ClientConfig, ObservabilityConfig, TimeoutConfig};
pub use executor::{AttemptOutcome, RequestAttempt, RequestExecutor};
pub use index::Index;
pub use reqwest::Method;
pub use secured_key::{
    Restrictions, SecuredApiKey, decode_secured_api_key, generate_secured_api_key,
    generate_secured_api_key_with_user_token, remaining_validity, verify_secured_api_key,
};
pub use transport::{HostRequest, HostResponse, ReqwestTransport, Transport, TransportError};

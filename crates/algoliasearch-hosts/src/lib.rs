//! Host selection for the Algolia search client
//!
//! Provides the ordered candidate hosts an API call is tried against, split by
//! traffic kind, plus an optional health tracker that pushes repeatedly
//! failing hosts to the back of the order.
//!
//! # Host Sources
//!
//! - **Default**: three load-balanced `algolianet.com` hosts followed by one
//!   `algolia.net` fallback host, derived from the application id
//! - **Explicit**: a caller-supplied list, used verbatim

pub mod config;
pub mod health;
pub mod host;
pub mod pool;

pub use config::HostsConfig;
pub use health::HostHealth;
pub use host::{Host, HostRole};
pub use pool::{HostPool, default_hosts};

//! Host types

use std::fmt;

use serde::{Deserialize, Serialize};

/// A candidate host for API calls
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    /// Hostname, optionally with a port (e.g., "myapp-1.algolianet.com" or "127.0.0.1:8080")
    pub name: String,

    /// Position of the host in the default topology
    pub role: HostRole,
}

impl Host {
    /// Create a primary host
    pub fn primary(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: HostRole::Primary }
    }

    /// Create a fallback host
    pub fn fallback(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: HostRole::Fallback }
    }

    pub fn is_fallback(&self) -> bool {
        self.role == HostRole::Fallback
    }

    /// Base URL for this host under the given scheme
    pub fn url(&self, scheme: &str) -> String {
        format!("{}://{}", scheme, self.name)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Role of a host within a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HostRole {
    /// Fast, load-balanced host tried first
    #[default]
    Primary,

    /// Last-resort host appended after the primaries
    Fallback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_constructors() {
        let host = Host::primary("app-1.algolianet.com");
        assert_eq!(host.name, "app-1.algolianet.com");
        assert_eq!(host.role, HostRole::Primary);
        assert!(!host.is_fallback());

        let host = Host::fallback("app-dsn.algolia.net");
        assert!(host.is_fallback());
    }

    #[test]
    fn test_host_url_and_display() {
        let host = Host::primary("127.0.0.1:8080");
        assert_eq!(host.url("http"), "http://127.0.0.1:8080");
        assert_eq!(format!("{}", host), "127.0.0.1:8080");
    }
}

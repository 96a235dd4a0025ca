//! Host pools
//!
//! A pool holds the ordered candidate hosts for read and write traffic. It is
//! built once when the client is created and never changes afterwards.

use algoliasearch_types::{Error, Result, TrafficKind};
use tracing::debug;

use crate::{Host, HostsConfig};

/// Domain of the load-balanced primary hosts
const PRIMARY_DOMAIN: &str = "algolianet.com";
/// Domain of the fallback hosts
const FALLBACK_DOMAIN: &str = "algolia.net";
/// Number of synthesized primary hosts
const PRIMARY_HOST_COUNT: usize = 3;

/// Ordered candidate hosts for one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPool {
    read: Vec<Host>,
    write: Vec<Host>,
    explicit: bool,
}

impl HostPool {
    /// Build the default pool for an application id
    ///
    /// Read traffic goes to `{app}-1..3.algolianet.com` then `{app}-dsn.algolia.net`;
    /// write traffic goes to the same primaries then `{app}.algolia.net`.
    pub fn new(application_id: &str) -> Result<Self> {
        if application_id.trim().is_empty() {
            return Err(Error::Config("application_id cannot be empty".to_string()));
        }

        let pool = Self {
            read: default_hosts(application_id, TrafficKind::Read),
            write: default_hosts(application_id, TrafficKind::Write),
            explicit: false,
        };
        debug!(application_id = %application_id, "Synthesized default host pool");
        Ok(pool)
    }

    /// Build a pool from an explicit host list
    ///
    /// The list is used verbatim for both traffic kinds: order is preserved and
    /// duplicates are kept.
    pub fn with_hosts<I, S>(hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<Host> = hosts.into_iter().map(Host::primary).collect();
        if hosts.is_empty() {
            return Err(Error::Config("explicit host list cannot be empty".to_string()));
        }
        if let Some(blank) = hosts.iter().position(|h| h.name.trim().is_empty()) {
            return Err(Error::Config(format!("host at position {} is blank", blank)));
        }

        debug!(count = hosts.len(), "Using explicit host list");
        Ok(Self { read: hosts.clone(), write: hosts, explicit: true })
    }

    /// Build a pool from configuration, preferring the explicit host list when present
    pub fn from_config(application_id: &str, config: &HostsConfig) -> Result<Self> {
        match &config.hosts {
            Some(hosts) => Self::with_hosts(hosts.iter().cloned()),
            None => Self::new(application_id),
        }
    }

    /// Ordered hosts for the given traffic kind
    pub fn hosts_for(&self, kind: TrafficKind) -> &[Host] {
        match kind {
            TrafficKind::Read => &self.read,
            TrafficKind::Write => &self.write,
        }
    }

    /// Number of hosts for the given traffic kind
    pub fn len(&self, kind: TrafficKind) -> usize {
        self.hosts_for(kind).len()
    }

    /// Whether the pool came from a caller-supplied list
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }
}

/// Default hosts for an application id and traffic kind
pub fn default_hosts(application_id: &str, kind: TrafficKind) -> Vec<Host> {
    let mut hosts: Vec<Host> = (1..=PRIMARY_HOST_COUNT)
        .map(|i| Host::primary(format!("{}-{}.{}", application_id, i, PRIMARY_DOMAIN)))
        .collect();

    let fallback = match kind {
        TrafficKind::Read => format!("{}-dsn.{}", application_id, FALLBACK_DOMAIN),
        TrafficKind::Write => format!("{}.{}", application_id, FALLBACK_DOMAIN),
    };
    hosts.push(Host::fallback(fallback));
    hosts
}

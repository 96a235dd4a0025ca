//! Configuration types for host selection

use serde::{Deserialize, Serialize};

/// Host selection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostsConfig {
    /// Explicit host list, used verbatim for both read and write traffic.
    /// When absent, hosts are derived from the application id.
    #[serde(default)]
    pub hosts: Option<Vec<String>>,

    /// Move hosts with repeated recent failures to the end of the per-call order
    #[serde(default)]
    pub demote_failing_hosts: bool,

    /// Consecutive failures before a host is demoted
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long a demoted host stays at the back of the order (in seconds)
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            hosts: None,
            demote_failing_hosts: false,
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

impl HostsConfig {
    /// Configuration with an explicit host list
    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { hosts: Some(hosts.into_iter().map(Into::into).collect()), ..Self::default() }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

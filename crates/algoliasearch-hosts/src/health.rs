//! Host health tracking with a circuit breaker
//!
//! Optional. When enabled, hosts that failed several calls in a row are moved
//! to the back of the per-call order until their recovery timeout elapses.
//! Hosts are never dropped, so a call still visits every host exactly once.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{Host, HostsConfig};

/// Failure bookkeeping for one host
#[derive(Debug, Default)]
struct HostState {
    /// Consecutive failure count
    failure_count: u32,
    /// Last failure time
    last_failure: Option<Instant>,
    /// Whether the circuit is open (host is demoted)
    circuit_open: bool,
}

impl HostState {
    fn is_available(&self, recovery_timeout: Duration) -> bool {
        if !self.circuit_open {
            return true;
        }

        // Half-open: give the host another chance once the timeout passed
        match self.last_failure {
            Some(last_failure) => last_failure.elapsed() >= recovery_timeout,
            None => true,
        }
    }

    fn record_success(&mut self) {
        self.failure_count = 0;
        self.last_failure = None;
        self.circuit_open = false;
    }

    /// Returns true when this failure opened the circuit
    fn record_failure(&mut self, threshold: u32) -> bool {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());

        if self.failure_count >= threshold && !self.circuit_open {
            self.circuit_open = true;
            return true;
        }

        false
    }
}

/// Shared host health tracker
///
/// Safe to share across concurrent callers; all state lives behind one lock.
#[derive(Debug)]
pub struct HostHealth {
    states: RwLock<HashMap<String, HostState>>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl HostHealth {
    /// Create a tracker
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
        }
    }

    /// Create a tracker when the configuration enables demotion
    pub fn from_config(config: &HostsConfig) -> Option<Self> {
        if !config.demote_failing_hosts {
            return None;
        }

        info!(
            failure_threshold = config.failure_threshold,
            recovery_timeout_secs = config.recovery_timeout_secs,
            "Host demotion enabled"
        );
        Some(Self::new(config.failure_threshold, Duration::from_secs(config.recovery_timeout_secs)))
    }

    /// Order hosts for one call: available hosts first, demoted hosts last
    ///
    /// Relative order inside each group is preserved.
    pub fn order(&self, hosts: &[Host]) -> Vec<Host> {
        let states = self.states.read();
        let (available, demoted): (Vec<&Host>, Vec<&Host>) = hosts.iter().partition(|host| {
            states.get(&host.name).is_none_or(|s| s.is_available(self.recovery_timeout))
        });

        if !demoted.is_empty() {
            debug!(demoted = demoted.len(), "Moving failing hosts to the end of the order");
        }

        available.into_iter().chain(demoted).cloned().collect()
    }

    /// Whether a host is currently in front of the order
    pub fn is_available(&self, host: &str) -> bool {
        self.states.read().get(host).is_none_or(|s| s.is_available(self.recovery_timeout))
    }

    /// Record a successful attempt
    pub fn record_success(&self, host: &str) {
        let mut states = self.states.write();
        if let Some(state) = states.get_mut(host) {
            if state.circuit_open {
                info!(host = %host, "Host recovered");
            }
            state.record_success();
        }
    }

    /// Record a failed attempt
    ///
    /// Returns true if the host was just demoted.
    pub fn record_failure(&self, host: &str) -> bool {
        let mut states = self.states.write();
        let state = states.entry(host.to_string()).or_default();
        let opened = state.record_failure(self.failure_threshold);

        if opened {
            warn!(host = %host, failure_count = state.failure_count, "Demoting failing host");
        } else {
            debug!(host = %host, failure_count = state.failure_count, "Host attempt failed");
        }

        opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(count: usize) -> Vec<Host> {
        (1..=count).map(|i| Host::primary(format!("app-{}.algolianet.com", i))).collect()
    }

    fn names(hosts: &[Host]) -> Vec<&str> {
        hosts.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn test_order_unchanged_without_failures() {
        let health = HostHealth::new(3, Duration::from_secs(60));
        let hosts = hosts(3);
        assert_eq!(health.order(&hosts), hosts);
    }

    #[test]
    fn test_failing_host_demoted() {
        let health = HostHealth::new(2, Duration::from_secs(60));
        let hosts = hosts(3);

        assert!(!health.record_failure("app-1.algolianet.com"));
        assert!(health.record_failure("app-1.algolianet.com"));

        let ordered = health.order(&hosts);
        assert_eq!(
            names(&ordered),
            vec!["app-2.algolianet.com", "app-3.algolianet.com", "app-1.algolianet.com"]
        );
        assert!(!health.is_available("app-1.algolianet.com"));
        assert!(health.is_available("app-2.algolianet.com"));
    }

    #[test]
    fn test_circuit_opens_once() {
        let health = HostHealth::new(1, Duration::from_secs(60));
        assert!(health.record_failure("app-1.algolianet.com"));
        assert!(!health.record_failure("app-1.algolianet.com"));
    }

    #[test]
    fn test_success_resets_failures() {
        let health = HostHealth::new(2, Duration::from_secs(60));
        health.record_failure("app-1.algolianet.com");
        health.record_success("app-1.algolianet.com");
        assert!(!health.record_failure("app-1.algolianet.com"));
        assert!(health.is_available("app-1.algolianet.com"));
    }

    #[test]
    fn test_recovery_after_timeout() {
        let health = HostHealth::new(1, Duration::ZERO);
        health.record_failure("app-2.algolianet.com");
        assert!(health.is_available("app-2.algolianet.com"));
        assert_eq!(health.order(&hosts(3)), hosts(3));
    }

    #[test]
    fn test_from_config_disabled_by_default() {
        assert!(HostHealth::from_config(&HostsConfig::default()).is_none());

        let config = HostsConfig { demote_failing_hosts: true, ..HostsConfig::default() };
        assert!(HostHealth::from_config(&config).is_some());
    }
}

//! Request execution with host failover
//!
//! A logical call is tried against the ordered hosts for its traffic kind, one
//! host at a time, until one of them produces a definitive answer:
//!
//! - 2xx with a JSON body: returned to the caller (first success wins)
//! - 4xx: returned to the caller as [`Error::Application`], no further hosts
//! - network failure, timeout, 5xx, undecodable 2xx: next host
//!
//! Each host is visited at most once per call. There is no backoff and no
//! second pass; when the list runs out the caller gets [`Error::Exhausted`]
//! with every attempt that was made.

use std::{fmt, sync::Arc, time::Duration};

use algoliasearch_hosts::{Host, HostHealth, HostPool};
pub use algoliasearch_types::{AttemptOutcome, RequestAttempt};
use algoliasearch_types::{Error, Result, TrafficKind};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::{Instant, error::Elapsed};
use tracing::{debug, error, warn};

use crate::{
    config::TimeoutConfig,
    metrics,
    transport::{HostRequest, HostResponse, Transport, TransportError},
};

/// Message used when a 4xx body carries no `message` field
const DEFAULT_CLIENT_ERROR_MESSAGE: &str = "invalid request";

/// Error body returned by the service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// What the executor does after one attempt
enum Verdict {
    /// Return this value to the caller
    Done(Value),
    /// Return this error to the caller without trying more hosts
    Reject(Error),
    /// Move on to the next host
    Retry(Error),
}

/// Executes API calls against a [`HostPool`] with failover
///
/// Cheap to clone; clones share the pool, transport and health tracker.
#[derive(Clone)]
pub struct RequestExecutor {
    pool: Arc<HostPool>,
    transport: Arc<dyn Transport>,
    health: Option<Arc<HostHealth>>,
    timeouts: TimeoutConfig,
    headers: Arc<Vec<(String, String)>>,
    scheme: String,
    record_metrics: bool,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("pool", &self.pool)
            .field("transport", &self.transport)
            .field("health", &self.health.is_some())
            .field("timeouts", &self.timeouts)
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl RequestExecutor {
    pub fn new(
        pool: Arc<HostPool>,
        transport: Arc<dyn Transport>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            pool,
            transport,
            health: None,
            timeouts,
            headers: Arc::new(Vec::new()),
            scheme: "https".to_string(),
            record_metrics: true,
        }
    }

    /// Headers sent with every request
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Arc::new(headers);
        self
    }

    /// URL scheme used for every host
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Reorder hosts per call using a shared health tracker
    pub fn with_health(mut self, health: Arc<HostHealth>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = enabled;
        self
    }

    pub fn pool(&self) -> &HostPool {
        &self.pool
    }

    /// Hosts in the order the next call of this kind will try them
    pub fn ordered_hosts(&self, kind: TrafficKind) -> Vec<Host> {
        let hosts = self.pool.hosts_for(kind);
        match &self.health {
            Some(health) => health.order(hosts),
            None => hosts.to_vec(),
        }
    }

    /// Execute one logical call
    ///
    /// `path` is the request path including any query string, e.g.
    /// `/1/indexes/products/query`. The body is serialized once and sent
    /// unchanged to every host that is tried.
    ///
    /// Write calls are not deduplicated. If a host applied a write but the
    /// response was lost (connection reset, timeout), the next host receives
    /// the same write again.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        kind: TrafficKind,
    ) -> Result<Value> {
        let body = body.map(serde_json::to_vec).transpose()?;
        let hosts = self.ordered_hosts(kind);
        let read_timeout = self.timeouts.read_for(kind);
        let budget = self.timeouts.attempt_budget(kind);

        let mut attempts = Vec::with_capacity(hosts.len());
        let mut last_error = None;

        for (index, host) in hosts.iter().enumerate() {
            debug!(
                attempt = index + 1,
                host = %host,
                method = %method,
                path = %path,
                kind = %kind,
                "Attempting request"
            );

            let request = HostRequest {
                method: method.clone(),
                url: format!("{}{}", host.url(&self.scheme), path),
                headers: &self.headers,
                body: body.as_deref(),
                timeout: read_timeout,
            };

            let started = Instant::now();
            let result = tokio::time::timeout(budget, self.transport.send(request)).await;
            let elapsed = started.elapsed();

            let (outcome, verdict) = classify(host, result, budget, elapsed);
            if self.record_metrics {
                metrics::record_attempt(kind, &outcome, elapsed.as_secs_f64());
            }
            attempts.push(RequestAttempt {
                host: host.name.clone(),
                budget,
                elapsed,
                outcome: outcome.clone(),
            });

            match verdict {
                Verdict::Done(value) => {
                    debug!(host = %host, attempts = attempts.len(), "Request succeeded");
                    self.record_success(host);
                    return Ok(value);
                },
                Verdict::Reject(err) => {
                    debug!(host = %host, error = %err, "Request rejected by service");
                    // The host answered; it is healthy even if the request was not.
                    self.record_success(host);
                    return Err(err);
                },
                Verdict::Retry(err) => {
                    warn!(
                        attempt = index + 1,
                        host = %host,
                        outcome = %outcome,
                        error = %err,
                        "Host attempt failed"
                    );
                    self.record_failure(host);
                    if self.record_metrics && index + 1 < hosts.len() {
                        metrics::record_failover(kind, &outcome);
                    }
                    last_error = Some(err);
                },
            }
        }

        if self.record_metrics {
            metrics::record_exhausted(kind);
        }
        error!(
            attempts = attempts.len(),
            method = %method,
            path = %path,
            kind = %kind,
            "All hosts failed"
        );

        // HostPool never hands out an empty list
        let last = last_error
            .unwrap_or_else(|| Error::Config(format!("no hosts configured for {} traffic", kind)));
        Err(Error::Exhausted { attempts, last: Box::new(last) })
    }

    fn record_success(&self, host: &Host) {
        if let Some(health) = &self.health {
            health.record_success(&host.name);
        }
    }

    fn record_failure(&self, host: &Host) {
        if let Some(health) = &self.health {
            if health.record_failure(&host.name) && self.record_metrics {
                metrics::record_host_demoted();
            }
        }
    }
}

/// Turn the result of one attempt into an outcome record and a verdict
fn classify(
    host: &Host,
    result: std::result::Result<std::result::Result<HostResponse, TransportError>, Elapsed>,
    budget: Duration,
    elapsed: Duration,
) -> (AttemptOutcome, Verdict) {
    let response = match result {
        Ok(Ok(response)) => response,
        Ok(Err(TransportError::Timeout)) => {
            let err =
                Error::Timeout { host: host.name.clone(), after_ms: elapsed.as_millis() as u64 };
            return (AttemptOutcome::Timeout, Verdict::Retry(err));
        },
        Err(_) => {
            let err =
                Error::Timeout { host: host.name.clone(), after_ms: budget.as_millis() as u64 };
            return (AttemptOutcome::Timeout, Verdict::Retry(err));
        },
        Ok(Err(TransportError::Network(message))) => {
            let err = Error::TransientHost { host: host.name.clone(), message: message.clone() };
            return (AttemptOutcome::NetworkError { message }, Verdict::Retry(err));
        },
    };

    let status = response.status;
    match status {
        200..=299 => match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => (AttemptOutcome::Success { status }, Verdict::Done(value)),
            Err(e) => {
                let message = e.to_string();
                let err =
                    Error::InvalidResponse { host: host.name.clone(), message: message.clone() };
                (AttemptOutcome::InvalidBody { message }, Verdict::Retry(err))
            },
        },
        400..=499 => {
            let message = error_message(&response.body)
                .unwrap_or_else(|| DEFAULT_CLIENT_ERROR_MESSAGE.to_string());
            let err = Error::Application { status, message };
            (AttemptOutcome::ClientError { status }, Verdict::Reject(err))
        },
        _ => {
            let message = error_message(&response.body)
                .unwrap_or_else(|| format!("unexpected status {}", status));
            let err = Error::Service { host: host.name.clone(), status, message };
            (AttemptOutcome::ServerError { status }, Verdict::Retry(err))
        },
    }
}

/// `message` field of a JSON error body, if any
fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body).ok().and_then(|b| b.message)
}

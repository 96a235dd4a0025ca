//! Search client
//!
//! Thin layer over [`RequestExecutor`]: builds the host pool, transport and
//! default headers from a [`ClientConfig`] and exposes a few index-level calls.

use std::{fmt, sync::Arc};

use algoliasearch_hosts::{Host, HostHealth, HostPool};
use algoliasearch_types::{Result, TrafficKind};
use reqwest::Method;
use serde_json::Value;
use tracing::info;

use crate::{
    config::ClientConfig,
    executor::RequestExecutor,
    index::{Index, encode_path_segment},
    metrics,
    secured_key::{self, Restrictions},
    transport::{ReqwestTransport, Transport},
};

pub const APPLICATION_ID_HEADER: &str = "X-Algolia-Application-Id";
pub const API_KEY_HEADER: &str = "X-Algolia-API-Key";
pub const USER_AGENT: &str = concat!("Algolia for Rust ", env!("CARGO_PKG_VERSION"));

/// Algolia search client
///
/// Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct Client {
    application_id: String,
    executor: RequestExecutor,
    record_metrics: bool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("application_id", &self.application_id)
            .field("executor", &self.executor)
            .finish()
    }
}

impl Client {
    /// Client for an application using the default hosts
    pub fn new(application_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::new(application_id, api_key))
    }

    /// Client that talks only to the given hosts, in order
    pub fn with_hosts<I, S>(
        application_id: impl Into<String>,
        api_key: impl Into<String>,
        hosts: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(&ClientConfig::new(application_id, api_key).with_hosts(hosts))
    }

    /// Client backed by reqwest
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeouts.connect())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Client backed by a custom transport
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let pool = HostPool::from_config(&config.application_id, &config.hosts)?;
        let record_metrics = config.observability.metrics_enabled;
        if record_metrics {
            metrics::init();
        }

        let mut executor = RequestExecutor::new(Arc::new(pool), transport, config.timeouts)
            .with_headers(default_headers(config))
            .with_scheme(config.scheme.clone())
            .with_metrics(record_metrics);
        if let Some(health) = HostHealth::from_config(&config.hosts) {
            executor = executor.with_health(Arc::new(health));
        }

        info!(
            application_id = %config.application_id,
            read_hosts = executor.pool().len(TrafficKind::Read),
            write_hosts = executor.pool().len(TrafficKind::Write),
            explicit_hosts = executor.pool().is_explicit(),
            "Search client initialized"
        );

        Ok(Self { application_id: config.application_id.clone(), executor, record_metrics })
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// Hosts in the order the next call of this kind will try them
    pub fn hosts(&self, kind: TrafficKind) -> Vec<Host> {
        self.executor.ordered_hosts(kind)
    }

    /// Execute a raw API call with failover
    ///
    /// See [`RequestExecutor::execute`] for retry semantics.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        kind: TrafficKind,
    ) -> Result<Value> {
        self.executor.execute(method, path, body, kind).await
    }

    /// List all indexes of the application
    pub async fn list_indexes(&self) -> Result<Value> {
        self.execute(Method::GET, "/1/indexes", None, TrafficKind::Read).await
    }

    /// Delete an index
    pub async fn delete_index(&self, name: &str) -> Result<Value> {
        let path = format!("/1/indexes/{}", encode_path_segment(name));
        self.execute(Method::DELETE, &path, None, TrafficKind::Write).await
    }

    /// Handle to an index; performs no I/O
    pub fn init_index(&self, name: impl Into<String>) -> Index {
        Index::new(name, self.executor.clone())
    }

    /// See [`secured_key::generate_secured_api_key`]
    pub fn generate_secured_api_key(
        &self,
        master_key: &str,
        restrictions: impl Into<Restrictions>,
    ) -> Result<String> {
        let token = secured_key::generate_secured_api_key(master_key, restrictions)?;
        if self.record_metrics {
            metrics::record_secured_key(false);
        }
        Ok(token)
    }

    /// See [`secured_key::generate_secured_api_key_with_user_token`]
    pub fn generate_secured_api_key_with_user_token(
        &self,
        master_key: &str,
        restrictions: impl Into<Restrictions>,
        user_token: impl Into<String>,
    ) -> Result<String> {
        let token = secured_key::generate_secured_api_key_with_user_token(
            master_key,
            restrictions,
            user_token,
        )?;
        if self.record_metrics {
            metrics::record_secured_key(true);
        }
        Ok(token)
    }
}

/// Headers sent with every request
fn default_headers(config: &ClientConfig) -> Vec<(String, String)> {
    let mut headers = vec![
        (APPLICATION_ID_HEADER.to_string(), config.application_id.clone()),
        (API_KEY_HEADER.to_string(), config.api_key.clone()),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ];
    headers.extend(config.extra_headers.iter().map(|(k, v)| (k.clone(), v.clone())));
    headers
}

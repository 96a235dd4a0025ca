use std::{collections::BTreeMap, fmt, path::Path, time::Duration};

use algoliasearch_hosts::HostsConfig;
use algoliasearch_types::{Error, Result, TrafficKind};
use serde::{Deserialize, Serialize};

/// Root configuration for the search client
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application identifier, used for default hosts and the application-id header
    /// Environment variable: ALGOLIA_APPLICATION_ID
    #[serde(default)]
    pub application_id: String,

    /// API key sent with every request
    /// Environment variable: ALGOLIA_API_KEY
    #[serde(default)]
    pub api_key: String,

    /// Host selection
    #[serde(default)]
    pub hosts: HostsConfig,

    /// Per-attempt timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// URL scheme for every host ("https" in production)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Additional headers sent with every request (e.g. X-Algolia-UserToken)
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Per-attempt timeout configuration
///
/// The connect timeout is shorter than either read timeout; write traffic gets
/// the longest read timeout since bulk indexing legitimately takes longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_ms: u64,

    /// Read timeout for read traffic in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_ms: u64,

    /// Read timeout for write traffic in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout_ms(),
            read_ms: default_read_timeout_ms(),
            write_ms: default_write_timeout_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    /// Read timeout for the given traffic kind
    pub fn read_for(&self, kind: TrafficKind) -> Duration {
        match kind {
            TrafficKind::Read => Duration::from_millis(self.read_ms),
            TrafficKind::Write => Duration::from_millis(self.write_ms),
        }
    }

    /// Upper bound for one attempt (connect + read)
    pub fn attempt_budget(&self, kind: TrafficKind) -> Duration {
        self.connect() + self.read_for(kind)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Record request metrics through the `metrics` facade
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), metrics_enabled: default_metrics_enabled() }
    }
}

// Default value functions
fn default_scheme() -> String {
    "https".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    1000 // 1 second
}

fn default_read_timeout_ms() -> u64 {
    5000 // 5 seconds
}

fn default_write_timeout_ms() -> u64 {
    30000 // 30 seconds
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            api_key: String::new(),
            hosts: HostsConfig::default(),
            timeouts: TimeoutConfig::default(),
            scheme: default_scheme(),
            extra_headers: BTreeMap::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("application_id", &self.application_id)
            .field("api_key", &"*****")
            .field("hosts", &self.hosts)
            .field("timeouts", &self.timeouts)
            .field("scheme", &self.scheme)
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .field("observability", &self.observability)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration for an application with default hosts and timeouts
    pub fn new(application_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { application_id: application_id.into(), api_key: api_key.into(), ..Self::default() }
    }

    /// Replace the default hosts with an explicit list
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.hosts = Some(hosts.into_iter().map(Into::into).collect());
        self
    }

    /// Add a header sent with every request
    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Load configuration with layered precedence: defaults → file → env vars
    ///
    /// Environment variables use the `ALGOLIA_` prefix and `__` as the section
    /// separator, e.g. `ALGOLIA_APPLICATION_ID` or `ALGOLIA_TIMEOUTS__WRITE_MS`.
    /// `ALGOLIA_HOSTS__HOSTS` takes a comma-separated host list.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder =
            config::Config::builder().add_source(config::File::from(path.as_ref()).required(false));

        let builder = builder.add_source(
            config::Environment::with_prefix("ALGOLIA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("hosts.hosts"),
        );

        let config =
            builder.build().map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))
    }

    /// Load configuration with defaults, never failing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => {
                tracing::info!("Configuration loaded successfully from {:?}", path.as_ref());
                config
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to load config from {:?}. Using defaults.",
                    path.as_ref()
                );
                Self::default()
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.application_id.trim().is_empty() {
            return Err(Error::Config("application_id cannot be empty".to_string()));
        }

        if self.api_key.trim().is_empty() {
            return Err(Error::Config("api_key cannot be empty".to_string()));
        }

        if self.scheme != "https" && self.scheme != "http" {
            return Err(Error::Config(format!(
                "Invalid scheme: {}. Must be 'https' or 'http'",
                self.scheme
            )));
        }

        if self.scheme == "http" {
            tracing::warn!("scheme is 'http' - API keys will be sent unencrypted");
        }

        if let Some(hosts) = &self.hosts.hosts {
            if hosts.is_empty() {
                return Err(Error::Config("hosts.hosts cannot be an empty list".to_string()));
            }
        }

        let timeouts = &self.timeouts;
        if timeouts.connect_ms == 0 || timeouts.read_ms == 0 || timeouts.write_ms == 0 {
            return Err(Error::Config("timeouts must be greater than 0".to_string()));
        }
        if timeouts.connect_ms >= timeouts.read_ms || timeouts.connect_ms >= timeouts.write_ms {
            return Err(Error::Config(
                "timeouts.connect_ms must be shorter than both read timeouts".to_string(),
            ));
        }
        if timeouts.write_ms < timeouts.read_ms {
            tracing::warn!(
                read_ms = timeouts.read_ms,
                write_ms = timeouts.write_ms,
                "timeouts.write_ms is shorter than timeouts.read_ms; bulk writes may time out"
            );
        }

        Ok(())
    }
}

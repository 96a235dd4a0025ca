use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;

/// Initialize structured logging for binaries embedding the client
///
/// `RUST_LOG` wins over the configured level. With `json` set, events are
/// emitted as JSON lines; otherwise a compact single-line format is used.
///
/// Installing a global subscriber twice is not an error here: the second call
/// leaves the existing subscriber in place and returns `false`.
///
/// # Examples
///
/// ```no_run
/// use algoliasearch_client::{config::ObservabilityConfig, logging};
///
/// let config = ObservabilityConfig { log_level: "debug".to_string(), metrics_enabled: false };
/// logging::init(&config, false);
/// ```
pub fn init(config: &ObservabilityConfig, json: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(fmt_layer).try_init().is_ok()
}

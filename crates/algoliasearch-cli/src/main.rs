use std::time::Duration;

use algoliasearch_client::{
    Client, ClientConfig, Restrictions, decode_secured_api_key, logging, remaining_validity,
    secured_key, verify_secured_api_key,
};
use algoliasearch_hosts::{Host, HostPool};
use algoliasearch_types::TrafficKind;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "algolia")]
#[command(about = "Algolia search client", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "algolia.toml")]
    config: String,

    /// Use JSON structured logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a secured API key
    SecuredKey {
        /// Master API key (defaults to the configured api_key)
        #[arg(long, env = "ALGOLIA_MASTER_KEY", hide_env_values = true)]
        master_key: Option<String>,

        #[arg(long)]
        tag_filters: Option<String>,

        #[arg(long)]
        user_token: Option<String>,

        /// Key lifetime in seconds from now
        #[arg(long)]
        valid_for: Option<u64>,

        /// Comma-separated index names or patterns
        #[arg(long, value_delimiter = ',')]
        restrict_indices: Vec<String>,

        /// IPv4 network in CIDR notation
        #[arg(long)]
        restrict_sources: Option<String>,

        /// Additional restriction as name=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Check a secured API key against a master key and print its restrictions
    VerifyKey {
        token: String,

        /// Master API key (defaults to the configured api_key)
        #[arg(long, env = "ALGOLIA_MASTER_KEY", hide_env_values = true)]
        master_key: Option<String>,
    },

    /// Print the hosts calls are tried against, in order
    Hosts {
        #[arg(long, value_enum, default_value_t = Kind::Read)]
        kind: Kind,
    },

    /// List all indexes
    ListIndexes,

    /// Search an index
    Search {
        index: String,

        query: String,

        /// Search parameter as name=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Read,
    Write,
}

impl From<Kind> for TrafficKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Read => TrafficKind::Read,
            Kind::Write => TrafficKind::Write,
        }
    }
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) =
        s.split_once('=').ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    if name.is_empty() {
        return Err(format!("empty name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

fn master_key(explicit: Option<String>, config: &ClientConfig) -> Result<String> {
    match explicit {
        Some(key) if !key.is_empty() => Ok(key),
        _ if !config.api_key.is_empty() => Ok(config.api_key.clone()),
        _ => bail!("no master key: pass --master-key or set ALGOLIA_API_KEY"),
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ClientConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    logging::init(&config.observability, args.json_logs);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = %args.config,
        "Starting algolia CLI"
    );

    match args.command {
        Command::SecuredKey {
            master_key: explicit,
            tag_filters,
            user_token,
            valid_for,
            restrict_indices,
            restrict_sources,
            params,
        } => {
            let master_key = master_key(explicit, &config)?;

            let mut restrictions = Restrictions::new();
            if let Some(tag_filters) = tag_filters {
                restrictions = restrictions.tag_filters(tag_filters);
            }
            if let Some(user_token) = user_token {
                restrictions = restrictions.user_token(user_token);
            }
            if let Some(secs) = valid_for {
                restrictions = restrictions.valid_for(Duration::from_secs(secs));
            }
            if !restrict_indices.is_empty() {
                restrictions = restrictions.restrict_indices(&restrict_indices);
            }
            if let Some(sources) = restrict_sources {
                restrictions = restrictions.restrict_sources(sources);
            }
            for (name, value) in params {
                restrictions = restrictions.param(name, value);
            }

            let token = secured_key::generate_secured_api_key(&master_key, restrictions)?;
            println!("{}", token);
        },
        Command::VerifyKey { token, master_key: explicit } => {
            let master_key = master_key(explicit, &config)?;
            let decoded = decode_secured_api_key(&token)?;

            let mut report = serde_json::json!({
                "valid": verify_secured_api_key(&token, &master_key)?,
                "restrictions": decoded.restrictions(),
            });
            if decoded.valid_until().is_some() {
                report["remaining_secs"] = remaining_validity(&token)?.into();
            }
            print_json(&report)?;

            if report["valid"] != true {
                bail!("secured API key was not derived from this master key");
            }
        },
        Command::Hosts { kind } => {
            let pool = HostPool::from_config(&config.application_id, &config.hosts)?;
            for host in pool.hosts_for(kind.into()) {
                println!("{}", host_line(&config.scheme, host));
            }
        },
        Command::ListIndexes => {
            let client = Client::from_config(&config)?;
            print_json(&client.list_indexes().await?)?;
        },
        Command::Search { index, query, params } => {
            let client = Client::from_config(&config)?;
            let response = client.init_index(index).search_with_params(&query, params).await?;
            print_json(&response)?;
        },
    }

    Ok(())
}

fn host_line(scheme: &str, host: &Host) -> String {
    if host.is_fallback() {
        format!("{}://{} (fallback)", scheme, host)
    } else {
        format!("{}://{}", scheme, host)
    }
}

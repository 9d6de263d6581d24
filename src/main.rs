//! # Main — CLI Entry Point
//!
//! Parses arguments, resolves the counter configuration, and routes each
//! subcommand to its runner in `cli.rs`.
//!
//! ## Subcommands
//!
//! `hash` and `url` are offline: they print fingerprints and request URLs without
//! touching the network. `hit` increments a page's counter, `count` reads one or
//! more counters, and `config` prints the effective configuration.
//!
//! ## Global Options
//!
//! Each has a `PAGEHITS_*` environment variable; a `.env` file in the working
//! directory is loaded first.
//!
//! - `--config`: TOML file (default `~/.pagehits/config.toml` when present).
//! - `--relay` / `--no-relay`: CORS relay base URL, or call the service directly.
//! - `--api-base`, `--namespace`, `--origin`: counting-service endpoint settings.
//! - `--timeout`: per-request timeout in seconds (none by default).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagehits::ConfigOverrides;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagehits", version, about = "Count page views with a remote hit counter")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "PAGEHITS_CONFIG")]
    config: Option<PathBuf>,

    /// CORS relay base URL (requests go to <relay>?url=<target>)
    #[arg(long, env = "PAGEHITS_RELAY")]
    relay: Option<String>,

    /// Call the counting service directly instead of through the relay
    #[arg(long)]
    no_relay: bool,

    /// Counting service base URL
    #[arg(long, env = "PAGEHITS_API_BASE")]
    api_base: Option<String>,

    /// Counter namespace that scopes every page key
    #[arg(long, env = "PAGEHITS_NAMESPACE")]
    namespace: Option<String>,

    /// Value sent in the Origin header
    #[arg(long, env = "PAGEHITS_ORIGIN")]
    origin: Option<String>,

    /// Per-request timeout in seconds (no timeout when unset)
    #[arg(long, env = "PAGEHITS_TIMEOUT")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the 53-bit fingerprint of each page name
    Hash {
        /// Page names
        #[arg(required = true)]
        names: Vec<String>,
        /// Hash seed
        #[arg(long, default_value_t = 0)]
        seed: u32,
    },
    /// Print the URL that would be requested for a page
    Url {
        /// Page name
        name: String,
        /// Show the increment URL instead of the read URL
        #[arg(long)]
        up: bool,
    },
    /// Register one view of a page and print the new count
    Hit {
        /// Page name
        name: String,
    },
    /// Read the current count of one or more pages
    Count {
        /// Page names
        #[arg(required = true)]
        names: Vec<String>,
        /// Print a JSON object of name -> count (null when unavailable)
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            relay_url: self.relay.clone(),
            no_relay: self.no_relay,
            api_base: self.api_base.clone(),
            namespace: self.namespace.clone(),
            origin: self.origin.clone(),
            timeout_secs: self.timeout,
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Results go to stdout, so logs always go to stderr. LOG_FORMAT=json for
    // machine-readable lines.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Hash { names, seed } => cli::run_hash(names, *seed),
        Commands::Url { name, up } => cli::run_url(&cli, name, *up),
        Commands::Hit { name } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::run_hit(&cli, name))
        }
        Commands::Count { names, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::run_count(&cli, names, *json))
        }
        Commands::Config => cli::run_config(&cli),
    }
}

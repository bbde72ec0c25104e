//! Command line arguments for the `toprated` binary

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use toprated::{Config, Result};

/// List the top-rated entries for a query key.
#[derive(Debug, Parser)]
#[command(name = "toprated", version)]
#[command(about = "Fetch every page for a query key and print the names tied at the highest rating", long_about = None)]
pub struct Cli {
    /// Query key, e.g. a city name (default: from config, "denver")
    #[arg(short, long)]
    pub key: Option<String>,

    /// Maximum number of names to print (default: from config, 5)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Endpoint to query
    #[arg(long)]
    pub base_url: Option<String>,

    /// Ceiling on simultaneous requests
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Attempts per page, first attempt included
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print the names as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Debug-level logging for this crate
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load the config file (if any), apply flag overrides and validate
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(max_connections) = self.max_connections {
            config.api.max_connections = max_connections;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.api.request_timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(key) = &self.key {
            config.query.default_key = key.clone();
        }
        if let Some(limit) = self.limit {
            config.query.default_limit = usize::try_from(limit).unwrap_or(usize::MAX);
        }

        config.validate()?;
        Ok(config)
    }
}

//! termrank - TF-IDF document ranking daemon
//!
//! Entry point for the ranking server.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use termrank::config::{DEFAULT_MAX_RESULTS, DEFAULT_PERIOD_SECS, DEFAULT_SEPARATOR};
use termrank::server::{init_tracing, ServerConfig, TfIdfServer, TracingConfig};
use termrank::{Config, Error, Result};

/// termrank - rank documents in a directory by TF-IDF
#[derive(Parser, Debug)]
#[command(name = "termrank")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the documents to rank
    #[arg(short, long, env = "TERMRANK_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Space separated list of terms to rank against
    #[arg(short, long, env = "TERMRANK_TERMS")]
    terms: Option<String>,

    /// Number of documents shown per report
    #[arg(short = 'n', long, env = "TERMRANK_MAX_RESULTS", default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Seconds between reports
    #[arg(short, long, env = "TERMRANK_PERIOD", default_value_t = DEFAULT_PERIOD_SECS)]
    period: u64,

    /// Additional directories to watch
    #[arg(short, long, env = "TERMRANK_WATCH", value_delimiter = ',')]
    watch: Vec<PathBuf>,

    /// Append reports to this file instead of stdout
    #[arg(short, long, env = "TERMRANK_OUTPUT")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,

    /// Enable JSON logging output
    #[arg(long, env = "TERMRANK_LOG_JSON")]
    log_json: bool,

    /// Re-attempt documents that failed to index on each refresh
    #[arg(long, env = "TERMRANK_RETRY_FAILED")]
    retry_failed: bool,

    /// Token separator used when reading documents
    #[arg(long, env = "TERMRANK_SEPARATOR", default_value = DEFAULT_SEPARATOR)]
    separator: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = Config::level_for_verbosity(cli.verbose);

    init_tracing(&TracingConfig {
        level: log_level.to_string(),
        json: cli.log_json,
    });

    tracing::info!("termrank v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match build_config(cli, log_level) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };

    let server = TfIdfServer::new(ServerConfig::from(&config));
    server.run().await
}

/// Turn parsed arguments into a normalised, validated `Config`.
///
/// Missing arguments surface as `Error::Config` so they exit like any other
/// configuration problem.
fn build_config(cli: Cli, log_level: &str) -> Result<Config> {
    let directory = cli
        .directory
        .ok_or_else(|| Error::config("no input directory supplied"))?;

    let mut config = Config {
        directory,
        extra_dirs: cli.watch,
        terms: cli
            .terms
            .as_deref()
            .map(Config::parse_terms)
            .unwrap_or_default(),
        max_results: cli.max_results,
        period_secs: cli.period,
        log_level: log_level.to_string(),
        output: cli.output,
        separator: cli.separator,
        retry_failed: cli.retry_failed,
    };
    config.normalize();

    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;
    Ok(config)
}

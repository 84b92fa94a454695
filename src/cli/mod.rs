//! Command-line interface for the mog demo runner
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and argument overrides
//! - Log level selection

use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

use crate::config::{Config, ConnectionConfig};
use crate::error::Result;

pub mod demo;

/// mog - short calls for common MongoDB idioms
#[derive(Parser, Debug)]
#[command(
    name = "mog",
    version,
    about = "Walk through the mog session facade against a MongoDB server",
    long_about = "Seeds a location and a property collection, then demonstrates find,
bulk writes, aggregation with lookup and totals, and CSV export and import."
)]
pub struct CliArgs {
    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(long, value_name = "URI")]
    pub uri: Option<String>,

    /// Database name to use
    #[arg(long = "db", value_name = "NAME")]
    pub database: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Write the property export here (defaults to a temp file)
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse process arguments and load configuration
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already-parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        config.validate()?;

        Ok(Self { args, config })
    }

    /// Apply CLI arguments over file and environment values
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if let Some(database) = &args.database {
            config.connection.database = database.clone();
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connection settings after all overrides
    pub fn connection_config(&self) -> &ConnectionConfig {
        &self.config.connection
    }

    /// Where the demo writes its CSV export
    pub fn csv_path(&self) -> PathBuf {
        self.args
            .csv
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mog_props.csv"))
    }

    /// Log level: `--vv` beats `-v` beats configuration
    pub fn log_level(&self) -> Level {
        if self.args.very_verbose {
            Level::TRACE
        } else if self.args.verbose {
            Level::DEBUG
        } else {
            self.config.logging.level.to_tracing_level()
        }
    }

    /// URI with credentials hidden, for display
    pub fn sanitized_uri(&self) -> String {
        sanitize_uri(&self.config.connection.uri)
    }
}

/// Hide everything between `://` and `@`
fn sanitize_uri(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(proto_end), Some(host_start)) if host_start > proto_end => {
            format!("{}***{}", &uri[..proto_end + 3], &uri[host_start..])
        }
        _ => uri.to_string(),
    }
}

//! CLI commands and argument parsing

use crate::config::{env_flag, ENV_DEBUG};
use crate::types::{LogLevel, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fidoo extractor CLI
#[derive(Parser, Debug)]
#[command(name = "fidoo-extractor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level requested by `--verbose` or `FIDOO_DEBUG`
    pub fn log_level(&self) -> LogLevel {
        let env_debug = std::env::var(ENV_DEBUG).is_ok_and(|v| env_flag(&v));
        if self.verbose || env_debug {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract objects, stage them and export flat tables
    Run {
        /// Object types to extract (comma-separated)
        #[arg(long)]
        objects: Option<String>,

        /// Output directory for exported tables
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file format
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Skip the dependent-object phase
        #[arg(long)]
        no_dependent: bool,

        /// DuckDB file to stage into (in-memory by default)
        #[arg(long)]
        staging: Option<PathBuf>,

        /// File receiving the run state (JSON)
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Validate credentials against the API
    Check,

    /// List the object catalog
    Objects,
}

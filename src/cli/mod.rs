//! CLI module
//!
//! Command-line interface for the extractor.
//!
//! # Commands
//!
//! - `run` - Extract, normalize and export the requested objects
//! - `check` - Validate the API credentials
//! - `objects` - List the object catalog

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::{render_summary, Runner};

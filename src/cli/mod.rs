//! CLI module
//!
//! Command-line interface for the scraper.
//!
//! # Commands
//!
//! - `scrape` - Fetch all contracts and export them
//! - `check` - Probe the configured session tokens
//! - `cookies` - Turn a pasted cURL command into env lines

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;

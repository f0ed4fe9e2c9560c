//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scraper for e-play.pl contract announcements
#[derive(Parser, Debug)]
#[command(name = "eplay-scraper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every contract and export it
    Scrape {
        /// Items per page (1-120)
        #[arg(long)]
        page_size: Option<u32>,

        /// JSON output path
        #[arg(long)]
        json: Option<PathBuf>,

        /// CSV output path
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Parquet output path
        #[arg(long)]
        parquet: Option<PathBuf>,

        /// Skip the local file sinks
        #[arg(long)]
        no_files: bool,

        /// Upload to Google Sheets
        #[arg(long)]
        sheets: bool,

        /// Drop records with a repeated (id, link)
        #[arg(long)]
        dedupe: bool,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Test whether the current session tokens are accepted
    Check,

    /// Extract cookies from a "Copy as cURL" command and print them as env lines
    Cookies {
        /// The cURL command; read from stdin when omitted
        curl: Option<String>,
    },
}

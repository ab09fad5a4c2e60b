pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "urlsetter")]
#[command(about = "Resolve shortened URLs to their final destination", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/urlsetter/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of resolutions allowed to run at once
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve one or more URLs
    Resolve {
        /// URLs to resolve
        #[arg(required = true)]
        urls: Vec<String>,

        /// Open each result in the default browser
        #[arg(long)]
        open: bool,

        /// Print analytics parameters as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show the cached resolution of a URL without network access
    Lookup {
        /// URL to look up
        url: String,
    },
    /// Show cache usage
    Stats,
}

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "eddy")]
#[command(about = "A threaded aggregator for paginated JSON feeds", long_about = None)]
pub struct Cli {
    /// Number of feeds fetched in parallel (overrides the config file)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch feeds, following each one's pagination chain
    Fetch {
        /// Feed URLs to ingest
        urls: Vec<String>,

        /// Read newline-separated seed URLs from a file
        #[arg(short, long)]
        file: Option<std::path::PathBuf>,
    },
    /// List stored feeds
    Feeds,
    /// Print every reply thread, newest roots first
    Threads,
}

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eddy::app::AppContext;
use eddy::cli::{commands, Cli, Commands};
use eddy::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }

    let ctx = AppContext::new(&config)?;

    match cli.command {
        Commands::Fetch { urls, file } => {
            commands::fetch_feeds(&ctx, &urls, file.as_deref()).await?;
        }
        Commands::Feeds => {
            commands::list_feeds(&ctx)?;
        }
        Commands::Threads => {
            commands::show_threads(&ctx)?;
        }
    }

    Ok(())
}

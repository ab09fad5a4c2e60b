use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use urlsetter::app::AppContext;
use urlsetter::cli::commands::{self, ConsoleNotifier};
use urlsetter::cli::{Cli, Commands};
use urlsetter::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(workers) = cli.workers {
        config.resolver.max_concurrency = workers;
    }

    let ctx = AppContext::new(config, Arc::new(ConsoleNotifier))?;

    match cli.command {
        Commands::Resolve { urls, open, json } => {
            commands::resolve_urls(&ctx, &urls, open, json).await?;
        }
        Commands::Lookup { url } => {
            commands::lookup(&ctx, &url)?;
        }
        Commands::Stats => {
            commands::stats(&ctx)?;
        }
    }

    Ok(())
}

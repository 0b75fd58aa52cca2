use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adlog::app::AppContext;
use adlog::cli::{commands, Cli, Commands};
use adlog::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Ingest { urls, workers } => {
            commands::ingest(&ctx, &urls, workers, cli.json).await?;
        }
        Commands::View { id } => {
            commands::view(&ctx, id, cli.json)?;
        }
        Commands::Show { id } => {
            commands::show(&ctx, id, cli.json)?;
        }
        Commands::Top { limit } => {
            commands::top(&ctx, limit, cli.json)?;
        }
    }

    Ok(())
}

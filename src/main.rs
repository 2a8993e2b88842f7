//! Errspec CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use errspec::cli::{Cli, Commands};
use errspec::infrastructure::config::ConfigLoader;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => errspec::cli::handle_error(&err, cli.json),
    };

    let result = match cli.command {
        Commands::Specs(args) => {
            errspec::cli::commands::specs::execute(args, &config, cli.json).await
        }
    };

    if let Err(err) = result {
        errspec::cli::handle_error(&err, cli.json);
    }
}

//! Maestro CLI entry point.

use clap::Parser;

use maestro::cli::{commands, handle_error, load_config, Cli, Commands};
use maestro::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err.context("Failed to load configuration"), cli.json),
    };

    let _logger = match LogConfig::try_from(&config.logging).and_then(|c| LoggerImpl::init(&c)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err.context("Failed to initialize logging"), cli.json),
    };

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, config, cli.json).await,
        Commands::Config(command) => commands::config::execute(&command, config, cli.json),
        Commands::Workers => commands::workers::execute(&config, cli.json),
        Commands::History { limit } => {
            commands::history::execute(&config, limit, cli.json).await
        }
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}

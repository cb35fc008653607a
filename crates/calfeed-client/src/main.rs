//! calfeed CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calfeed_client::cli::{Cli, Command, ConfigAction};
use calfeed_client::commands;
use calfeed_client::config::ClientConfig;
use calfeed_client::error::{ClientError, ClientResult};
use calfeed_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else if matches!(cli.command, Command::Watch { .. }) {
        TracingConfig::watch()
    } else {
        TracingConfig::cli()
    };
    if let Some(format) = cli.log_format {
        tracing_config = tracing_config.with_format(format);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    match cli.command {
        Command::Fetch { url, output } => {
            commands::fetch::run(&config, url.as_deref(), output).await
        }
        Command::Expand {
            input,
            output,
            on_malformed,
        } => commands::expand::run(&config, input, output, on_malformed),
        Command::Sync { args } => commands::sync::run(&config, &args).await,
        Command::Watch { args, interval } => {
            commands::watch::run(&config, &args, interval).await
        }
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}

//! uuku - Ubuntu mainline kernel updater CLI

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use crossterm::style::Stylize;
use tracing_subscriber::EnvFilter;

use uuku_cli::{Cli, Commands, cmd};
use uuku_core::UpdateError;
use uuku_core::config::ConfigError;
use uuku_core::error::exit;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit::INVALID_INPUT
            } else {
                exit::SUCCESS
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Completions { shell }) = cli.command {
        cmd::completions::completions(shell);
        return Ok(());
    }

    let config = cli.load_config()?;
    tracing::debug!(?config, "effective configuration");

    match cli.command {
        Some(Commands::Check { json }) => cmd::check::check(&config, json).await,
        Some(Commands::Completions { .. }) => Ok(()),
        None => cmd::upgrade::upgrade(&config, cli.dry_run, cli.quiet).await,
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<UpdateError>() {
        e.exit_code()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        exit::INVALID_INPUT
    } else {
        exit::IO
    }
}

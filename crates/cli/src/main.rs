//! AuthServer admin console CLI

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "authserver-admin")]
#[command(about = "Administer an AuthServer from the command line")]
#[command(version)]
struct Cli {
    /// Set logging level (defaults to `log_level` from the configuration)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Configuration file (TOML or YAML)
    #[arg(short = 'c', long, global = true, env = "AUTHSERVER_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the stored session, config and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref(), cli.data_dir)?;
    logging::init_logging(
        cli.log_level.map(Level::from),
        &config.log_level,
        &config.data_dir(),
        cli.no_file_log,
    )?;

    info!("Starting authserver-admin");

    if cli.timeout == 0 {
        match cli.command.execute(config).await {
            Ok(()) => {
                info!("Command completed successfully");
            }
            Err(e) => {
                error!("Command failed: {e:#}");
                std::process::exit(1);
            }
        }
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(config)).await {
            Ok(Ok(())) => {
                info!("Command completed successfully");
            }
            Ok(Err(e)) => {
                error!("Command failed: {e:#}");
                std::process::exit(1);
            }
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

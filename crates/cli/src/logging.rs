use admin_core::tracing::{InstrumentationConfig, init_tracing};
use anyhow::Result;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_NAME: &str = "cli.log";
const CRATES: [&str; 4] = ["authserver_admin", "admin_core", "admin_http", "admin_session"];

/// Initialize logging for the CLI
///
/// `cli_level` comes from `-l`; without it the configured level applies.
pub fn init_logging(
    cli_level: Option<Level>,
    configured: &str,
    data_dir: &Path,
    no_file_log: bool,
) -> Result<()> {
    let directive = filter_directive(cli_level, configured);

    if no_file_log {
        // Only log to stderr
        let config = InstrumentationConfig::from_env().with_log_level(directive);
        init_tracing(&config)
    } else {
        init_file_logging(&directive, data_dir)
    }
}

/// Filter directive for the console crates.
///
/// A bare level is applied to every console crate; anything else is taken as
/// a full `EnvFilter` directive.
fn filter_directive(cli_level: Option<Level>, configured: &str) -> String {
    let level = match cli_level {
        Some(level) => level,
        None => match Level::from_str(configured.trim()) {
            Ok(level) => level,
            Err(_) => return configured.trim().to_string(),
        },
    };

    let level_str = level.as_str().to_lowercase();
    CRATES
        .iter()
        .map(|name| format!("{name}={level_str}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn init_file_logging(directive: &str, data_dir: &Path) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let log_file_path = log_file_path(data_dir);
    if let Some(parent) = log_file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_file_path)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .try_init()?;

    Ok(())
}

fn log_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE_NAME)
}

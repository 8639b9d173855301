//! CLI configuration utilities

use admin_core::AdminConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File looked up in the data directory when `--config` is not given
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the console configuration.
///
/// An explicit `--data-dir` wins over the configured one.
pub fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<AdminConfig> {
    let default_file = data_dir
        .clone()
        .unwrap_or_else(|| AdminConfig::default().data_dir())
        .join(CONFIG_FILE_NAME);

    let file = path.or_else(|| default_file.exists().then_some(default_file.as_path()));
    let mut config = AdminConfig::load(file)
        .with_context(|| format!("Failed to load configuration from {file:?}"))?;

    if data_dir.is_some() {
        config.data_dir = data_dir;
    }
    Ok(config)
}

/// Generate a default configuration file
pub fn generate_default_config(path: &Path) -> Result<()> {
    AdminConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write configuration to {}", path.display()))
}

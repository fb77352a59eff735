//! Configuration file discovery and command-line overrides
//!
//! An explicitly named configuration file must exist. Without one, the
//! default `<config dir>/Todoscan/todoscan.toml` is used when present and the
//! built-in defaults otherwise. Command-line values always win.

use crate::app::cli::args::Args;
use crate::core::settings::{ConfigError, Settings};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("The specified configuration file does not exist: {}", .0.display())]
    MissingConfigFile(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid marker configuration: {0}")]
    Patterns(String),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Todoscan").join("todoscan.toml"))
}

/// Configuration file to load, if any
pub fn resolve_config_path(
    explicit: Option<&Path>,
    default: Option<PathBuf>,
) -> Result<Option<PathBuf>, CliError> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(CliError::MissingConfigFile(path.to_path_buf())),
        None => Ok(default.filter(|path| path.exists())),
    }
}

/// Load settings from the discovered file and apply command-line overrides
pub fn load_settings(args: &Args) -> Result<Settings, CliError> {
    let mut settings = match resolve_config_path(args.config_file.as_deref(), default_config_path())? {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            Settings::load(&path)?
        }
        None => Settings::default(),
    };

    apply_overrides(args, &mut settings);
    settings.validate()?;
    Ok(settings)
}

pub fn apply_overrides(args: &Args, settings: &mut Settings) {
    if let Some(repos_dir) = &args.repos_dir {
        settings.repos_dir = repos_dir.clone();
    }
    if let Some(level) = &args.log_level {
        settings.log_level = Some(level.clone());
    }
    if let Some(format) = &args.log_format {
        settings.log_format = Some(format.clone());
    }
    if let Some(file) = &args.log_file {
        settings.log_file = Some(file.clone());
    }
}

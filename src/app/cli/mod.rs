//! Command-line interface

pub mod args;
pub mod config;

pub use args::{Args, OutputFormat};
pub use config::{load_settings, CliError};

//! Command-line arguments

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How scan events are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One JSON event per line
    #[default]
    Jsonl,
    /// Table of findings after the scan completes
    Text,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "todoscan")]
#[command(about = "Locate TODO, FIXME, BUG and NOTE markers in a git repository")]
#[command(version, long_version = crate::core::version::long_version())]
pub struct Args {
    /// Repository URL, local path, or name of a repository already cloned
    #[arg(value_name = "REPOSITORY", required_unless_present = "list")]
    pub repository: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Directory holding local clones
    #[arg(short = 'd', long = "repos-dir", value_name = "DIR")]
    pub repos_dir: Option<PathBuf>,

    /// Reuse an existing clone without contacting the remote
    #[arg(long = "no-pull")]
    pub no_pull: bool,

    /// Output format
    #[arg(short = 'F', long = "format", value_enum, default_value_t = OutputFormat::Jsonl)]
    pub format: OutputFormat,

    /// List locally known repositories and exit
    #[arg(long = "list", conflicts_with = "repository")]
    pub list: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to log to stderr)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<String>,

    /// Force coloured output
    #[arg(long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Args {
    /// Colour is used when forced, or when stdout is a terminal and not disabled
    pub fn use_color(&self, is_terminal: bool) -> bool {
        !self.no_color && (self.color || is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let args = Args::try_parse_from(["todoscan", "https://github.com/owner/project"]).unwrap();
        assert_eq!(args.repository.as_deref(), Some("https://github.com/owner/project"));
        assert_eq!(args.format, OutputFormat::Jsonl);
        assert!(!args.no_pull);
        assert!(!args.list);
    }

    #[test]
    fn test_all_options() {
        let args = Args::try_parse_from([
            "todoscan",
            "--config-file",
            "/etc/todoscan.toml",
            "--repos-dir",
            "/var/lib/todoscan",
            "--no-pull",
            "--format",
            "text",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--log-file",
            "none",
            "--no-color",
            "project",
        ])
        .unwrap();

        assert_eq!(args.repository.as_deref(), Some("project"));
        assert_eq!(args.config_file, Some(PathBuf::from("/etc/todoscan.toml")));
        assert_eq!(args.repos_dir, Some(PathBuf::from("/var/lib/todoscan")));
        assert!(args.no_pull);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.log_format.as_deref(), Some("json"));
        assert_eq!(args.log_file.as_deref(), Some("none"));
        assert!(!args.use_color(true));
    }

    #[test]
    fn test_repository_required_unless_listing() {
        assert!(Args::try_parse_from(["todoscan"]).is_err());
        let args = Args::try_parse_from(["todoscan", "--list"]).unwrap();
        assert!(args.list);
        assert!(args.repository.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Args::try_parse_from(["todoscan", "--format", "xml", "x"]).is_err());
        assert!(Args::try_parse_from(["todoscan", "--log-level", "loud", "x"]).is_err());
        assert!(Args::try_parse_from(["todoscan", "--color", "--no-color", "x"]).is_err());
    }

    #[test]
    fn test_color_selection() {
        let args = Args::try_parse_from(["todoscan", "x"]).unwrap();
        assert!(args.use_color(true));
        assert!(!args.use_color(false));

        let forced = Args::try_parse_from(["todoscan", "--color", "x"]).unwrap();
        assert!(forced.use_color(false));
    }
}

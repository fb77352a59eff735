//! Runtime settings shared by the scan pipeline
//!
//! Loaded from a TOML file (kebab-case keys, every key optional) and then
//! overridden by command-line flags.

use crate::core::retry::RetryPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

/// What a second acquisition request for a busy identifier does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Wait for the in-flight clone/pull to finish
    #[default]
    Wait,
    /// Fail immediately with a busy `LocalStateError`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            exponential: true,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            exponential: self.exponential,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PatternSettings {
    /// Marker tokens in priority order
    pub markers: Vec<String>,
    pub comment_prefixes: Vec<String>,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            markers: ["TODO", "FIXME", "BUG", "NOTE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            comment_prefixes: ["#", "//", "/*", "*", "<!--", "--", ";", "%"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ScanSettings {
    /// Ignore file read from the repository root
    pub ignore_file: String,
    pub extra_ignores: Vec<String>,
    /// File names (glob, case-insensitive) reported as TODO manifests
    pub manifest_names: Vec<String>,
    pub binary_probe_bytes: usize,
    pub max_file_size: u64,
    pub channel_capacity: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            ignore_file: ".gitignore".to_string(),
            extra_ignores: Vec::new(),
            manifest_names: ["todo.md", "todos.md", "todo.txt", "todo", "todo.markdown"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            binary_probe_bytes: 8000,
            max_file_size: 10 * 1024 * 1024,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub repos_dir: PathBuf,
    pub on_busy: BusyPolicy,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<String>,
    pub retry: RetrySettings,
    pub patterns: PatternSettings,
    pub scan: ScanSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repos_dir: default_repos_dir(),
            on_busy: BusyPolicy::default(),
            log_level: None,
            log_format: None,
            log_file: None,
            retry: RetrySettings::default(),
            patterns: PatternSettings::default(),
            scan: ScanSettings::default(),
        }
    }
}

/// `<data dir>/todoscan/repos`, or `./repos` when there is no data dir
pub fn default_repos_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("todoscan").join("repos"))
        .unwrap_or_else(|| PathBuf::from("repos"))
}

impl Settings {
    pub fn from_toml_str(contents: &str, path: &std::path::Path) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| ConfigError::Invalid {
            key: key.to_string(),
            message,
        };

        if self.retry.max_attempts == 0 {
            return Err(invalid(
                "retry.max-attempts",
                "must be at least 1".to_string(),
            ));
        }
        if self.patterns.markers.is_empty() {
            return Err(invalid(
                "patterns.markers",
                "at least one marker is required".to_string(),
            ));
        }
        if let Some(marker) = self
            .patterns
            .markers
            .iter()
            .find(|m| m.is_empty() || !m.chars().all(|c| c.is_alphanumeric() || c == '_'))
        {
            return Err(invalid(
                "patterns.markers",
                format!("'{}' is not a valid marker token", marker),
            ));
        }
        if self.patterns.comment_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid(
                "patterns.comment-prefixes",
                "prefixes cannot be empty".to_string(),
            ));
        }
        for pattern in self
            .scan
            .manifest_names
            .iter()
            .chain(self.scan.extra_ignores.iter())
        {
            glob::Pattern::new(pattern.trim_start_matches('!'))
                .map_err(|e| invalid("scan", format!("invalid glob '{}': {}", pattern, e)))?;
        }
        if self.scan.channel_capacity == 0 {
            return Err(invalid(
                "scan.channel-capacity",
                "must be at least 1".to_string(),
            ));
        }
        if self.scan.binary_probe_bytes == 0 {
            return Err(invalid(
                "scan.binary-probe-bytes",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retry.policy(), RetryPolicy::default());
        assert_eq!(settings.patterns.markers[0], "TODO");
        assert_eq!(settings.on_busy, BusyPolicy::Wait);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            repos-dir = "/srv/repos"
            on-busy = "reject"

            [retry]
            max-attempts = 5

            [scan]
            extra-ignores = ["*.generated.go"]
        "#;

        let settings = Settings::from_toml_str(toml, Path::new("todoscan.toml")).unwrap();

        assert_eq!(settings.repos_dir, PathBuf::from("/srv/repos"));
        assert_eq!(settings.on_busy, BusyPolicy::Reject);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.base_delay_ms, 1000);
        assert_eq!(settings.scan.extra_ignores, vec!["*.generated.go"]);
        assert_eq!(settings.scan.ignore_file, ".gitignore");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = Settings::from_toml_str("colour = true", Path::new("x.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            "[retry]\nmax-attempts = 0",
            "[patterns]\nmarkers = []",
            "[patterns]\nmarkers = [\"TO DO\"]",
            "[scan]\nmanifest-names = [\"todo[.md\"]",
            "[scan]\nchannel-capacity = 0",
        ];

        for toml in cases {
            let result = Settings::from_toml_str(toml, Path::new("x.toml"));
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "expected validation failure for: {}",
                toml
            );
        }
    }
}

//! Ignore-file reading
//!
//! Turns an ignore file into the ordered list of rules it contains. Blank
//! lines and comments are dropped; everything else is kept verbatim so the
//! filter can apply standard ignore-file precedence (later rules win).

use std::io;
use std::path::Path;

/// Source of ignore rules for a repository
pub trait RuleSource: Send + Sync {
    /// Ordered rules from `ignore_file`; a missing file yields no rules
    fn read_rules(&self, ignore_file: &Path) -> io::Result<Vec<String>>;
}

/// Reads rules from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileRuleSource;

impl RuleSource for FileRuleSource {
    fn read_rules(&self, ignore_file: &Path) -> io::Result<Vec<String>> {
        match std::fs::read_to_string(ignore_file) {
            Ok(contents) => Ok(parse_rules(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

pub fn parse_rules(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

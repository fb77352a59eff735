//! Scanner data types

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One marker comment located in a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Path relative to the repository root, `/`-separated
    pub file_path: String,
    /// 1-indexed
    pub line_num: usize,
    /// The matching line, trimmed
    pub todo_text: String,
    /// The following line, trimmed; empty at end of file
    pub next_line: String,
    /// Configured token that matched
    #[serde(skip)]
    pub marker: String,
}

/// A task-list file reported in full
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub file_path: String,
    pub content: String,
}

/// Counters for a single traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_scanned: usize,
    /// Unreadable, binary, oversized or non-UTF-8 files
    pub files_skipped: usize,
    pub files_ignored: usize,
    pub directories_pruned: usize,
    pub findings: usize,
    pub duration: Duration,
}

/// `/`-separated form of a repository-relative path
pub(crate) fn relative_display(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

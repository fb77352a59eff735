//! Event types for the scan stream
//!
//! Each event serializes to one JSON object tagged by `type`:
//!
//! ```json
//! {"type":"init","repo_name":"project","repo_url":"https://github.com/owner/project"}
//! {"type":"todo","todo":{"file_path":"src/a.py","line_num":3,"todo_text":"# TODO: x","next_line":"y = 1"},"count":1}
//! {"type":"todo_md_files","files":[{"file_path":"TODO.md","content":"..."}]}
//! {"type":"complete","count":1}
//! {"type":"error","message":"...","code":"NotFound","correlation_id":"ERR-..."}
//! ```

use crate::core::error::ScannerError;
use crate::scanner::types::{Finding, ManifestFile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Init {
        repo_name: String,
        repo_url: String,
    },
    Todo {
        todo: Finding,
        count: usize,
    },
    TodoMdFiles {
        files: Vec<ManifestFile>,
    },
    Complete {
        count: usize,
    },
    Error {
        message: String,
        code: String,
        correlation_id: String,
    },
}

impl ScanEvent {
    /// `error` event for a classified failure; the message is the user-facing one
    pub fn failure(error: &ScannerError) -> Self {
        ScanEvent::Error {
            message: error.display_message().to_string(),
            code: error.kind().to_string(),
            correlation_id: error.correlation_id().to_string(),
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::Init { .. } => "init",
            ScanEvent::Todo { .. } => "todo",
            ScanEvent::TodoMdFiles { .. } => "todo_md_files",
            ScanEvent::Complete { .. } => "complete",
            ScanEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::Complete { .. } | ScanEvent::Error { .. })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

//! Scan session state
//!
//! A session turns the steps of one scan into events and keeps the running
//! finding count. It enforces the event order: `init`, any number of `todo`,
//! `todo_md_files`, then exactly one of `complete` or `error`.

use crate::core::error::ScannerError;
use crate::events::event::ScanEvent;
use crate::repository::types::RepositoryReference;
use crate::scanner::types::{Finding, ManifestFile};
use serde::Serialize;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display, strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Complete,
    Failed,
}

#[derive(Debug)]
pub struct ScanSession {
    identifier: String,
    reference: Option<RepositoryReference>,
    count: usize,
    status: SessionStatus,
}

impl ScanSession {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reference: None,
            count: 0,
            status: SessionStatus::Running,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn reference(&self) -> Option<&RepositoryReference> {
        self.reference.as_ref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// `init` once the repository has been acquired
    pub fn start(&mut self, reference: &RepositoryReference) -> ScanEvent {
        debug_assert!(self.reference.is_none(), "session already started");
        self.reference = Some(reference.clone());
        ScanEvent::Init {
            repo_name: reference.name.clone(),
            repo_url: reference
                .remote_url
                .clone()
                .unwrap_or_else(|| self.identifier.clone()),
        }
    }

    pub fn record(&mut self, finding: Finding) -> ScanEvent {
        debug_assert_eq!(self.status, SessionStatus::Running);
        self.count += 1;
        ScanEvent::Todo {
            todo: finding,
            count: self.count,
        }
    }

    pub fn manifests(&mut self, files: Vec<ManifestFile>) -> ScanEvent {
        debug_assert_eq!(self.status, SessionStatus::Running);
        ScanEvent::TodoMdFiles { files }
    }

    pub fn complete(&mut self) -> ScanEvent {
        debug_assert_eq!(self.status, SessionStatus::Running);
        self.status = SessionStatus::Complete;
        ScanEvent::Complete { count: self.count }
    }

    pub fn fail(&mut self, error: &ScannerError) -> ScanEvent {
        debug_assert_eq!(self.status, SessionStatus::Running);
        self.status = SessionStatus::Failed;
        ScanEvent::failure(error)
    }
}

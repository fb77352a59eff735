//! Scanner Component
//!
//! Traverses a repository working tree and produces marker findings lazily,
//! plus the task-list manifest files found in the same tree.
//!
//! ## Core Features
//!
//! - **ScanEngine**: configured once, starts any number of independent scans
//! - **FindingIter**: pull-based traversal; nothing is read ahead of the consumer
//! - **Ignore-aware**: ignored directories are pruned before descent
//! - **Manifest collection**: `TODO.md` style files returned whole

pub mod api;
pub mod engine;
pub mod manifest;
pub mod types;

pub use engine::{FindingIter, ScanEngine};
pub use types::{Finding, ManifestFile, ScanStats};

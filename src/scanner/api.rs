//! Scanner API
//!
//! Public surface of the scanner system.

pub use crate::scanner::engine::{FindingIter, ScanEngine};
pub use crate::scanner::manifest::collect_manifest_files;
pub use crate::scanner::types::{Finding, ManifestFile, ScanStats};

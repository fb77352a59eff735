//! Repository data types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// A repository known to the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReference {
    /// Normalised identifier
    pub identifier: String,
    /// Name of the working directory
    pub name: String,
    /// Working directory under the store root
    pub path: PathBuf,
    /// Where the repository was cloned from, when known
    pub remote_url: Option<String>,
    /// Last successful clone or fast-forward
    pub last_synced: Option<DateTime<Utc>>,
}

/// How an acquisition treats a repository that is already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquireMode {
    /// Clone when missing, fast-forward otherwise
    #[default]
    Sync,
    /// Clone when missing, reuse the existing clone without network access
    Cached,
}

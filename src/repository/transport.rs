//! Repository transport
//!
//! The primitive that moves repository data: clone a URL into a directory, or
//! fast-forward an existing working directory. Failures are reported as a
//! [`TransportError`] already classified from the transport's message.
//!
//! [`GitTransport`] clones with gix and fast-forwards with `git pull --ff-only`,
//! since gix cannot yet merge into a worktree.

use crate::core::error::ScannerError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Local repository state prevents the operation: {message}")]
    LocalState { message: String, locked: bool },

    #[error("Transport failure: {0}")]
    Other(String),
}

const LOCK_HINTS: &[&str] = &["index.lock", "shallow.lock", ".lock'", "locked", "unable to lock"];
const AUTH_HINTS: &[&str] = &[
    "authentication failed",
    "authentication required",
    "permission denied",
    "could not read username",
    "could not read password",
    "terminal prompts disabled",
    "invalid credentials",
    "http 401",
    "http 403",
    "status code 401",
    "status code 403",
];
const NOT_FOUND_HINTS: &[&str] = &[
    "repository not found",
    "not found",
    "does not exist",
    "does not appear to be a git repository",
    "no such file or directory",
    "http 404",
    "status code 404",
];
const LOCAL_STATE_HINTS: &[&str] = &[
    "already exists and is not an empty directory",
    "not possible to fast-forward",
    "diverging branches",
    "would be overwritten",
    "uncommitted changes",
    "unmerged files",
    "not a git repository",
];
const NETWORK_HINTS: &[&str] = &[
    "timed out",
    "timeout",
    "could not resolve host",
    "failed to resolve",
    "connection refused",
    "connection reset",
    "connection closed",
    "network is unreachable",
    "temporary failure",
    "early eof",
    "broken pipe",
    "tls",
    "ssl",
    "http 502",
    "http 503",
    "http 504",
];

impl TransportError {
    /// Classify a transport failure from its message text
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let mentions = |hints: &[&str]| hints.iter().any(|hint| lower.contains(hint));

        if mentions(LOCK_HINTS) {
            TransportError::LocalState {
                message,
                locked: true,
            }
        } else if mentions(AUTH_HINTS) {
            TransportError::Auth(message)
        } else if mentions(LOCAL_STATE_HINTS) {
            TransportError::LocalState {
                message,
                locked: false,
            }
        } else if mentions(NOT_FOUND_HINTS) {
            TransportError::NotFound(message)
        } else if mentions(NETWORK_HINTS) {
            TransportError::Network(message)
        } else {
            TransportError::Other(message)
        }
    }
}

impl From<TransportError> for ScannerError {
    fn from(error: TransportError) -> Self {
        let message = error.to_string();
        match error {
            TransportError::NotFound(_) => ScannerError::not_found(message),
            TransportError::Auth(_) => ScannerError::auth(message),
            TransportError::Network(_) => ScannerError::network(message),
            TransportError::LocalState { locked: true, .. } => {
                ScannerError::local_state(message).transient()
            }
            TransportError::LocalState { locked: false, .. } => ScannerError::local_state(message),
            TransportError::Other(_) => ScannerError::unknown(message),
        }
    }
}

/// Clone and fast-forward primitive used by the acquirer
#[async_trait]
pub trait RepositoryTransport: Send + Sync {
    /// Clone `url` into `destination`, which must not exist yet
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), TransportError>;

    /// Fast-forward the working directory at `path` from its upstream
    async fn pull(&self, path: &Path) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct GitTransport {
    git_program: PathBuf,
}

impl Default for GitTransport {
    fn default() -> Self {
        Self {
            git_program: PathBuf::from("git"),
        }
    }
}

impl GitTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `git` executable for fast-forwards
    pub fn with_git_program(git_program: impl Into<PathBuf>) -> Self {
        Self {
            git_program: git_program.into(),
        }
    }
}

fn clone_blocking(url: &str, destination: &Path) -> Result<(), TransportError> {
    let interrupt = AtomicBool::new(false);

    let mut prepare = gix::prepare_clone(url, destination)
        .map_err(|e| TransportError::classify(e.to_string()))?;
    let (mut checkout, _) = prepare
        .fetch_then_checkout(gix::progress::Discard, &interrupt)
        .map_err(|e| TransportError::classify(e.to_string()))?;
    checkout
        .main_worktree(gix::progress::Discard, &interrupt)
        .map_err(|e| TransportError::classify(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl RepositoryTransport for GitTransport {
    async fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), TransportError> {
        log::debug!("Cloning {} into {}", url, destination.display());

        let url = url.to_string();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || clone_blocking(&url, &destination))
            .await
            .map_err(|e| TransportError::Other(format!("Clone task failed: {}", e)))?
    }

    async fn pull(&self, path: &Path) -> Result<(), TransportError> {
        log::debug!("Fast-forwarding {}", path.display());

        let output = tokio::process::Command::new(&self.git_program)
            .arg("-C")
            .arg(path)
            .args(["pull", "--ff-only", "--quiet"])
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TransportError::Other(format!(
                    "Failed to run {}: {}",
                    self.git_program.display(),
                    e
                ))
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            if message.is_empty() {
                Err(TransportError::Other(format!(
                    "git pull exited with {}",
                    output.status
                )))
            } else {
                Err(TransportError::classify(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn test_classify_transport_messages() {
        let cases = [
            ("remote: Repository not found.", ErrorKind::NotFound, false),
            ("fatal: Authentication failed for 'https://host/x'", ErrorKind::AuthError, false),
            ("could not read Username for 'https://github.com'", ErrorKind::AuthError, false),
            ("Failed to connect: Connection timed out", ErrorKind::NetworkError, true),
            ("Could not resolve host: github.com", ErrorKind::NetworkError, true),
            (
                "fatal: Unable to create '/r/.git/index.lock': File exists.",
                ErrorKind::LocalStateError,
                true,
            ),
            ("fatal: Not possible to fast-forward, aborting.", ErrorKind::LocalStateError, false),
            ("something odd happened", ErrorKind::Unknown, false),
        ];

        for (message, kind, retryable) in cases {
            let error = ScannerError::from(TransportError::classify(message));
            assert_eq!(error.kind(), kind, "kind for: {}", message);
            assert_eq!(error.is_retryable(), retryable, "retryable for: {}", message);
        }
    }

    #[tokio::test]
    async fn test_clone_of_missing_local_source_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("does-not-exist");
        let destination = dir.path().join("clone");

        let result = GitTransport::new()
            .clone_repository(source.to_str().unwrap(), &destination)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pull_without_git_program_is_other() {
        let dir = tempfile::TempDir::new().unwrap();
        let transport = GitTransport::with_git_program(dir.path().join("no-such-git"));

        let err = transport.pull(dir.path()).await.unwrap_err();
        assert!(matches!(err, TransportError::Other(_)));
    }
}

//! Shared fixtures for integration tests
//!
//! `FixtureTransport` stands in for git: a clone copies a prepared directory
//! tree into the destination and a pull does nothing. Both count their calls
//! and can be scripted to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use todoscan::core::retry::RetryPolicy;
use todoscan::core::settings::{PatternSettings, ScanSettings};
use todoscan::events::EventEmitter;
use todoscan::patterns::PatternSet;
use todoscan::repository::api::{RepositoryAcquirer, RepositoryStore, RepositoryTransport, TransportError};
use todoscan::scanner::ScanEngine;

pub const REMOTE: &str = "https://example.org/team/project.git";

pub struct FixtureTransport {
    source: PathBuf,
    delay: Duration,
    failures: Mutex<Vec<TransportError>>,
    pub clones: AtomicUsize,
    pub pulls: AtomicUsize,
}

impl FixtureTransport {
    pub fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            delay: Duration::ZERO,
            failures: Mutex::new(Vec::new()),
            clones: AtomicUsize::new(0),
            pulls: AtomicUsize::new(0),
        }
    }

    /// Hold every clone open for `delay` to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next transport calls with these errors, in order
    pub fn failing_with(self, failures: Vec<TransportError>) -> Self {
        *self.failures.lock().unwrap() = failures;
        self
    }

    pub fn clone_count(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn pull_count(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    fn next_failure(&self) -> Option<TransportError> {
        let mut failures = self.failures.lock().unwrap();
        (!failures.is_empty()).then(|| failures.remove(0))
    }
}

#[async_trait]
impl RepositoryTransport for FixtureTransport {
    async fn clone_repository(&self, _url: &str, destination: &Path) -> Result<(), TransportError> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        copy_tree(&self.source, destination).map_err(|e| TransportError::Other(e.to_string()))
    }

    async fn pull(&self, _path: &Path) -> Result<(), TransportError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        match self.next_failure() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

pub fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Write `files` (relative path, contents) under a fresh temporary directory
pub fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        exponential: true,
    }
}

pub fn acquirer(repos: &Path, transport: Arc<FixtureTransport>) -> RepositoryAcquirer {
    let store = Arc::new(RepositoryStore::open(repos).unwrap());
    RepositoryAcquirer::new(store, transport).with_retry_policy(fast_retry())
}

pub fn emitter(acquirer: RepositoryAcquirer) -> EventEmitter {
    let patterns = PatternSet::from_settings(&PatternSettings::default()).unwrap();
    EventEmitter::new(acquirer, ScanEngine::new(patterns, ScanSettings::default()))
}

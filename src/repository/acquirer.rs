//! Repository Acquirer
//!
//! Brings a repository into the local store: clones it when it is missing and
//! fast-forwards it otherwise. Transient transport failures are retried under
//! the configured [`RetryPolicy`]; everything else fails on the first attempt.
//!
//! Acquisitions of the same repository are serialised through the store's
//! per-repository guard. Depending on [`BusyPolicy`] a second request either
//! waits for the first to finish or is rejected straight away.
//!
//! Clones land in a hidden staging directory next to their final path and are
//! renamed into place only once complete, so a failed clone never leaves a
//! half-populated working directory behind.

use crate::core::error::{ErrorContext, ScannerError, ScannerResult};
use crate::core::retry::{retry_async, RetryPolicy};
use crate::core::settings::BusyPolicy;
use crate::repository::identifier::RepositoryIdentifier;
use crate::repository::store::{RepositoryStore, PARTIAL_MARKER};
use crate::repository::transport::RepositoryTransport;
use crate::repository::types::{AcquireMode, RepositoryReference};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct RepositoryAcquirer {
    store: Arc<RepositoryStore>,
    transport: Arc<dyn RepositoryTransport>,
    policy: RetryPolicy,
    on_busy: BusyPolicy,
}

impl RepositoryAcquirer {
    pub fn new(store: Arc<RepositoryStore>, transport: Arc<dyn RepositoryTransport>) -> Self {
        Self {
            store,
            transport,
            policy: RetryPolicy::default(),
            on_busy: BusyPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_busy_policy(mut self, on_busy: BusyPolicy) -> Self {
        self.on_busy = on_busy;
        self
    }

    pub fn store(&self) -> &Arc<RepositoryStore> {
        &self.store
    }

    /// Acquire `identifier`, returning the reference to its working directory
    ///
    /// The store's freshness timestamp is updated only when the clone or
    /// fast-forward succeeds.
    pub async fn acquire(
        &self,
        identifier: &str,
        mode: AcquireMode,
    ) -> ScannerResult<RepositoryReference> {
        let context =
            ErrorContext::new("acquire", "repository_acquirer").with_repo_url(identifier.trim());

        self.acquire_inner(identifier, mode)
            .await
            .map_err(|e| e.with_context(&context))
    }

    async fn acquire_inner(
        &self,
        identifier: &str,
        mode: AcquireMode,
    ) -> ScannerResult<RepositoryReference> {
        let id = RepositoryIdentifier::parse(identifier)?;

        let guard = self.store.guard(&id)?;
        let _held = match self.on_busy {
            BusyPolicy::Wait => guard.lock_owned().await,
            BusyPolicy::Reject => guard.try_lock_owned().map_err(|_| {
                ScannerError::local_state(format!(
                    "Repository '{}' is already being acquired",
                    id
                ))
            })?,
        };

        let path = self.store.resolve(&id)?;

        if self.store.exists(&id)? {
            let reference = self.store.reference(&id)?;
            match (mode, reference.remote_url.is_some()) {
                (AcquireMode::Sync, true) => self.fast_forward(&path).await?,
                (AcquireMode::Sync, false) => {
                    log::debug!("{} has no upstream; using it as is", path.display())
                }
                (AcquireMode::Cached, _) => {
                    log::debug!("Reusing cached clone at {}", path.display())
                }
            }
        } else {
            let url = id.clone_url().ok_or_else(|| {
                ScannerError::not_found(format!("No local repository named '{}'", id.name()))
            })?;
            self.clone_fresh(url, &path).await?;
        }

        self.store.touch(&id)?;
        let reference = self.store.reference(&id)?;
        log::info!(
            "Acquired {} at {}",
            reference.identifier,
            reference.path.display()
        );
        Ok(reference)
    }

    async fn fast_forward(&self, path: &Path) -> ScannerResult<()> {
        let transport = Arc::clone(&self.transport);
        retry_async("pull", &self.policy, || {
            let transport = Arc::clone(&transport);
            let path = path.to_path_buf();
            async move { transport.pull(&path).await.map_err(ScannerError::from) }
        })
        .await
    }

    async fn clone_fresh(&self, url: &str, path: &Path) -> ScannerResult<()> {
        let transport = Arc::clone(&self.transport);
        let staging = staging_path(path);

        retry_async("clone", &self.policy, || {
            let transport = Arc::clone(&transport);
            let staging = staging.clone();
            let url = url.to_string();
            async move {
                let result = transport
                    .clone_repository(&url, &staging)
                    .await
                    .map_err(ScannerError::from);
                if result.is_err() {
                    remove_staging(&staging).await;
                }
                result
            }
        })
        .await?;

        if let Err(e) = tokio::fs::rename(&staging, path).await {
            remove_staging(&staging).await;
            return Err(ScannerError::local_state(format!(
                "Failed to move clone into {}",
                path.display()
            ))
            .with_source(e));
        }
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    path.with_file_name(format!(".{}{}{}", name, PARTIAL_MARKER, &suffix[..8]))
}

async fn remove_staging(staging: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(staging).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove staging directory {}: {}", staging.display(), e);
        }
    }
}

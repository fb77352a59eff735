//! Event Emitter
//!
//! Runs one scan per [`EventEmitter::start`] call and delivers its events over
//! a bounded channel as they are produced. The producer is a tokio task that
//! acquires the repository and then drains the lazy finding iterator on the
//! blocking pool, so slow disks never stall unrelated sessions.
//!
//! Closing or dropping the [`EventStream`] cancels the scan: the next send
//! fails and the producer stops before opening another file.

use crate::core::error::{ErrorContext, ScannerError};
use crate::core::error_handling::{from_join_error, safe_execute, safe_execute_async, ErrorReporter};
use crate::events::event::ScanEvent;
use crate::events::session::ScanSession;
use crate::repository::acquirer::RepositoryAcquirer;
use crate::repository::types::{AcquireMode, RepositoryReference};
use crate::scanner::engine::ScanEngine;
use crate::scanner::types::ManifestFile;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct EventEmitter {
    acquirer: RepositoryAcquirer,
    engine: ScanEngine,
    reporter: Arc<ErrorReporter>,
    capacity: usize,
}

impl EventEmitter {
    pub fn new(acquirer: RepositoryAcquirer, engine: ScanEngine) -> Self {
        let capacity = engine.settings().channel_capacity.max(1);
        Self {
            acquirer,
            engine,
            reporter: Arc::new(ErrorReporter::new()),
            capacity,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    /// Start scanning `identifier`; must be called from within a tokio runtime
    pub fn start(&self, identifier: impl Into<String>, mode: AcquireMode) -> EventStream {
        let identifier = identifier.into();
        let (sender, receiver) = mpsc::channel(self.capacity);

        let producer = Producer {
            acquirer: self.acquirer.clone(),
            engine: self.engine.clone(),
            reporter: Arc::clone(&self.reporter),
            sender,
        };
        let task = tokio::spawn(producer.run(identifier, mode));

        EventStream { receiver, task }
    }
}

/// How the blocking part of a scan ended
enum Traversal {
    Finished(Vec<ManifestFile>),
    Cancelled,
}

struct Producer {
    acquirer: RepositoryAcquirer,
    engine: ScanEngine,
    reporter: Arc<ErrorReporter>,
    sender: mpsc::Sender<ScanEvent>,
}

impl Producer {
    async fn run(self, identifier: String, mode: AcquireMode) {
        let mut session = ScanSession::new(identifier.clone());
        let context = ErrorContext::new("acquire", "event_emitter").with_repo_url(identifier.clone());

        let reference =
            match safe_execute_async(&context, self.acquirer.acquire(&identifier, mode)).await {
                Ok(reference) => reference,
                Err(e) => {
                    self.reporter.report(&e);
                    let _ = self.sender.send(session.fail(&e)).await;
                    return;
                }
            };

        if self.sender.send(session.start(&reference)).await.is_err() {
            log::info!("Consumer left before the scan of {} started", reference.name);
            return;
        }

        let engine = self.engine.clone();
        let sender = self.sender.clone();
        let name = reference.name.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let outcome = traverse(&engine, &reference, &mut session, &sender);
            (session, outcome)
        })
        .await;

        match joined {
            Ok((mut session, Ok(Traversal::Finished(files)))) => {
                if self.sender.send(session.manifests(files)).await.is_err() {
                    log::info!("Consumer left before the scan of {} completed", name);
                    return;
                }
                let _ = self.sender.send(session.complete()).await;
                log::debug!("Scan of {} complete with {} findings", name, session.count());
            }
            Ok((_, Ok(Traversal::Cancelled))) => {
                log::info!("Scan of {} cancelled by consumer", name);
            }
            Ok((mut session, Err(e))) => {
                self.reporter.report(&e);
                let _ = self.sender.send(session.fail(&e)).await;
            }
            Err(join_error) => {
                let context = ErrorContext::new("scan", "event_emitter").with_repo_url(identifier);
                let e = from_join_error(join_error, &context);
                self.reporter.report(&e);
                let _ = self.sender.send(ScanEvent::failure(&e)).await;
            }
        }
    }
}

/// Drain the findings into the channel; runs on the blocking pool
fn traverse(
    engine: &ScanEngine,
    reference: &RepositoryReference,
    session: &mut ScanSession,
    sender: &mpsc::Sender<ScanEvent>,
) -> Result<Traversal, ScannerError> {
    let context = ErrorContext::new("scan", "scan_engine").with_repo_url(reference.identifier.clone());

    let watched = sender.clone();
    let mut findings = safe_execute(&context, || engine.scan(reference))?
        .with_cancel(move || watched.is_closed());
    for finding in findings.by_ref() {
        if sender.blocking_send(session.record(finding)).is_err() {
            return Ok(Traversal::Cancelled);
        }
    }
    if findings.is_cancelled() {
        return Ok(Traversal::Cancelled);
    }

    let manifest_context = ErrorContext::new("collect_manifest_files", "scan_engine")
        .with_repo_url(reference.identifier.clone());
    let files = safe_execute(&manifest_context, || findings.manifest_files())?;
    Ok(Traversal::Finished(files))
}

/// Ordered events of one scan
///
/// Implements [`Stream`]; dropping it cancels the scan.
pub struct EventStream {
    receiver: mpsc::Receiver<ScanEvent>,
    task: JoinHandle<()>,
}

impl EventStream {
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.receiver.recv().await
    }

    /// Stop the producer; events already buffered can still be received
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// Cancel the scan and wait for the producer to wind down
    pub async fn cancel(mut self) {
        self.receiver.close();
        while self.receiver.recv().await.is_some() {}
        if let Err(e) = self.task.await {
            log::debug!("Scan producer ended abnormally: {}", e);
        }
    }

    /// Every remaining event, in order
    pub async fn collect_all(mut self) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = ScanEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ScanEvent>> {
        self.receiver.poll_recv(cx)
    }
}

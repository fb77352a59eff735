//! Shutdown Coordination
//!
//! Turns process signals into a broadcast that in-flight scan sessions can
//! observe. A second signal forces an immediate exit with status 130.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct ShutdownCoordinator {
    notify: broadcast::Sender<()>,
    requested: Arc<AtomicBool>,
    signals_seen: Arc<AtomicUsize>,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (notify, receiver) = broadcast::channel(4);
        let coordinator = Self {
            notify,
            requested: Arc::new(AtomicBool::new(false)),
            signals_seen: Arc::new(AtomicUsize::new(0)),
        };
        (coordinator, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    pub fn trigger_shutdown(&self) {
        self.requested.store(true, Ordering::Release);
        // no receivers left just means nobody is waiting
        let _ = self.notify.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Listen for SIGINT, SIGTERM and SIGHUP (Ctrl-C off unix)
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_signal_handlers(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            // a closed stdout pipe ends the process instead of failing writes
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            }

            for kind in [SignalKind::interrupt(), SignalKind::terminate(), SignalKind::hangup()] {
                let coordinator = self.clone();
                tokio::spawn(async move {
                    match signal(kind) {
                        Ok(mut stream) => {
                            while stream.recv().await.is_some() {
                                coordinator.on_signal();
                            }
                        }
                        Err(e) => log::warn!("Cannot listen for {:?}: {}", kind, e),
                    }
                });
            }
        }

        #[cfg(not(unix))]
        {
            let coordinator = self.clone();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    coordinator.on_signal();
                }
            });
        }
    }

    /// Returns true when this signal should end the process outright
    fn escalate(&self) -> bool {
        self.signals_seen.fetch_add(1, Ordering::AcqRel) >= 1
    }

    fn on_signal(&self) {
        if self.escalate() {
            log::warn!("Second interrupt received; exiting");
            std::process::exit(130);
        }
        log::info!("Interrupt received; cancelling scan");
        self.trigger_shutdown();
    }
}

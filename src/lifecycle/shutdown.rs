//! Shutdown coordination for the gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Clones share one signal. A task that starts waiting after the trigger
/// still observes it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been triggered.
    pub async fn signalled(&self) {
        let mut rx = self.tx.subscribe();
        // Subscribe before checking the flag so a concurrent trigger is not lost.
        if self.is_triggered() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

//! Coordinator registry owned by the composition root
//!
//! Running coordinator instances are registered here under their
//! configuration identity (the EAN) instead of living in global mutable
//! state. Teardown is explicit and awaited.

use crate::coordinator::{MeterCoordinator, MeterSnapshot};
use crate::error::Result;
use crate::logging::get_logger;
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Handle to a running coordinator instance
pub struct CoordinatorHandle {
    /// Snapshot receiver for consumers
    pub snapshot_rx: watch::Receiver<MeterSnapshot>,

    shutdown_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<Result<()>>,
}

/// Registry of running coordinators, keyed by EAN
#[derive(Default)]
pub struct CoordinatorRegistry {
    entries: HashMap<String, CoordinatorHandle>,
}

impl CoordinatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Spawn a coordinator's run loop and register its handle
    pub fn spawn(&mut self, key: String, mut coordinator: MeterCoordinator) {
        let snapshot_rx = coordinator.subscribe_snapshot();
        let shutdown_tx = coordinator.shutdown_handle();
        let task = tokio::spawn(async move { coordinator.run().await });

        self.entries.insert(
            key,
            CoordinatorHandle {
                snapshot_rx,
                shutdown_tx,
                task,
            },
        );
    }

    /// Look up a running instance
    pub fn get(&self, key: &str) -> Option<&CoordinatorHandle> {
        self.entries.get(key)
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Request shutdown of every instance and await their run loops
    pub async fn shutdown_all(self) {
        let logger = get_logger("registry");

        for (key, handle) in self.entries {
            let _ = handle.shutdown_tx.send(());
            match handle.task.await {
                Ok(Ok(())) => logger.info(&format!("Coordinator {} stopped", key)),
                Ok(Err(e)) => logger.error(&format!("Coordinator {} failed: {}", key, e)),
                Err(e) => logger.error(&format!("Coordinator {} task panicked: {}", key, e)),
            }
        }
    }
}

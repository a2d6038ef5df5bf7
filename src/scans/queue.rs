//! Bounded hand-off of scan ids from ingestion to the worker pool.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Producer side. Cloned into every component that enqueues.
#[derive(Clone)]
pub struct ScanQueue {
    tx: mpsc::Sender<Uuid>,
}

/// Consumer side, shared by all workers.
#[derive(Clone)]
pub struct QueueReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Uuid>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Accepted,
    /// Queue at capacity; the scan stays pending.
    Dropped,
    /// Workers are gone.
    Closed,
}

impl ScanQueue {
    pub fn bounded(capacity: usize) -> (ScanQueue, QueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            ScanQueue { tx },
            QueueReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Never waits for room.
    pub fn enqueue(&self, scan_id: Uuid) -> Enqueued {
        match self.tx.try_send(scan_id) {
            Ok(()) => {
                debug!(%scan_id, "scan queued");
                Enqueued::Accepted
            }
            Err(TrySendError::Full(_)) => {
                warn!(%scan_id, capacity = self.tx.max_capacity(), "scan queue full, dropping scan");
                Enqueued::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                warn!(%scan_id, "scan queue closed, dropping scan");
                Enqueued::Closed
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QueueReceiver {
    /// Next id, or `None` once every sender is dropped and the buffer drained.
    /// The lock is only held while waiting on the channel.
    pub async fn recv(&self) -> Option<Uuid> {
        self.rx.lock().await.recv().await
    }
}

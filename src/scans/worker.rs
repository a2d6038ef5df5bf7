//! Fixed-size pool of recognition workers fed by the scan queue.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};

use super::processor::{ProcessError, ScanProcessor};
use super::queue::QueueReceiver;

pub struct OcrWorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl OcrWorkerPool {
    /// Spawns `workers` tasks that share `rx`. They stop pulling new ids once
    /// `cancel` fires; a scan already being processed runs to completion.
    pub fn start(
        workers: usize,
        rx: QueueReceiver,
        processor: ScanProcessor,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (1..=workers.max(1))
            .map(|worker_id| {
                let rx = rx.clone();
                let processor = processor.clone();
                let cancel = cancel.clone();
                tokio::spawn(
                    run_worker(rx, processor, cancel)
                        .instrument(tracing::info_span!("ocr_worker", worker_id)),
                )
            })
            .collect::<Vec<_>>();
        info!(workers = handles.len(), "ocr worker pool started");
        Self { handles, cancel }
    }

    /// Signals shutdown and waits for every worker to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "ocr worker panicked");
            }
        }
        info!("ocr worker pool stopped");
    }
}

async fn run_worker(rx: QueueReceiver, processor: ScanProcessor, cancel: CancellationToken) {
    info!("worker started");
    loop {
        let scan_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };

        match processor.process(scan_id).await {
            Ok(status) => debug!(%scan_id, %status, "scan processed"),
            Err(ProcessError::AlreadyFinished(status)) => {
                debug!(%scan_id, %status, "skipping finished scan")
            }
            Err(e) => error!(%scan_id, error = %e, "scan processing error"),
        }
    }
    info!("worker stopped");
}

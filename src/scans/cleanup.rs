//! Periodic removal of scan images past the retention window.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::repo::ScanRepository;
use crate::config::CleanupConfig;
use crate::error::RepoError;
use crate::storage::ImageStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ImageRetentionJob {
    cfg: CleanupConfig,
    scans: Arc<dyn ScanRepository>,
    store: Arc<dyn ImageStore>,
}

impl ImageRetentionJob {
    pub fn new(cfg: CleanupConfig, scans: Arc<dyn ScanRepository>, store: Arc<dyn ImageStore>) -> Self {
        Self { cfg, scans, store }
    }

    /// Runs once right away, then every interval until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        let period = Duration::from_secs(self.cfg.interval_secs.max(1));
        info!(
            retention_days = self.cfg.retention_days,
            interval_secs = period.as_secs(),
            "image retention job started"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once(OffsetDateTime::now_utc()).await {
                            error!(error = %e, "image retention run failed");
                        }
                    }
                }
            }
            info!("image retention job stopped");
        })
    }

    /// Deletes one batch of expired images relative to `now`.
    pub async fn run_once(&self, now: OffsetDateTime) -> Result<CleanupReport, RepoError> {
        let cutoff = now - time::Duration::days(self.cfg.retention_days);
        let scans = self
            .scans
            .find_old_with_images(cutoff, self.cfg.batch_size)
            .await?;
        if scans.is_empty() {
            debug!(%cutoff, "no expired scan images");
            return Ok(CleanupReport::default());
        }

        let mut report = CleanupReport::default();
        for scan in scans {
            let Some(key) = scan.stored_image().map(str::to_string) else {
                continue;
            };
            if let Err(e) = self.store.delete_object(&key).await {
                warn!(scan_id = %scan.id, %key, error = %e, "failed to delete expired image");
                report.failed += 1;
                continue;
            }
            match self.scans.clear_image(scan.id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(scan_id = %scan.id, error = %e, "failed to clear image reference");
                    report.failed += 1;
                }
            }
        }
        info!(deleted = report.deleted, failed = report.failed, "image retention run finished");
        Ok(report)
    }
}

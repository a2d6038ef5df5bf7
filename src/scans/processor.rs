//! Drives one queued scan from `pending` to a terminal status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo::ScanRepository;
use super::repo_types::{Scan, ScanStatus};
use crate::error::{RepoError, ScanError};
use crate::nutrition;
use crate::ocr::{LabelReading, OcrService};
use crate::products::repo_types::OcrProductParts;
use crate::products::{Product, ProductRepository};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("load scan: {0}")]
    Load(RepoError),

    #[error("scan already {0}")]
    AlreadyFinished(ScanStatus),

    /// The outcome could not be recorded on the scan.
    #[error("record outcome: {0}")]
    Failed(#[from] ScanError),
}

#[derive(Clone)]
pub struct ScanProcessor {
    scans: Arc<dyn ScanRepository>,
    products: Arc<dyn ProductRepository>,
    ocr: OcrService,
    timeout: Duration,
}

impl ScanProcessor {
    pub fn new(
        scans: Arc<dyn ScanRepository>,
        products: Arc<dyn ProductRepository>,
        ocr: OcrService,
        timeout: Duration,
    ) -> Self {
        Self {
            scans,
            products,
            ocr,
            timeout,
        }
    }

    /// Returns the terminal status the scan ended in.
    pub async fn process(&self, scan_id: Uuid) -> Result<ScanStatus, ProcessError> {
        let started = Instant::now();
        let mut scan = self.scans.find_by_id(scan_id).await.map_err(ProcessError::Load)?;
        if scan.status.is_terminal() {
            return Err(ProcessError::AlreadyFinished(scan.status));
        }

        scan.start_processing()?;
        self.scans.update(&scan).await.map_err(ScanError::from)?;

        let reading = match self.read(&scan).await {
            Ok(reading) => reading,
            Err(message) => return self.fail(scan, message, started).await,
        };

        let score = nutrition::score(&reading.nutrients);
        let (highlights, insights) = nutrition::analyze(&reading.nutrients);
        let product = Product::from_ocr(
            scan.id,
            OcrProductParts {
                nutrients: reading.nutrients,
                serving_size: reading.serving_size,
                score,
                highlights: highlights.clone(),
                insights: insights.clone(),
            },
        );
        if let Err(e) = self.products.create(&product).await {
            return self.fail(scan, format!("save product: {e}"), started).await;
        }

        let fallback = scan.clone();
        scan.ocr_raw = Some(reading.raw_text);
        scan.complete(product.id, Some(score), highlights, insights)?;
        scan.processing_time_ms = Some(elapsed_ms(started));
        if let Err(e) = self.scans.update(&scan).await {
            return self.fail(fallback, format!("save scan: {e}"), started).await;
        }

        info!(
            %scan_id,
            product_id = %product.id,
            grade = %score.grade,
            elapsed_ms = ?scan.processing_time_ms,
            "scan completed"
        );
        Ok(ScanStatus::Completed)
    }

    async fn read(&self, scan: &Scan) -> Result<LabelReading, String> {
        let image_ref = scan
            .stored_image()
            .ok_or_else(|| "image not found or not stored".to_string())?;
        match tokio::time::timeout(self.timeout, self.ocr.read_label(image_ref)).await {
            Ok(Ok(reading)) => Ok(reading),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "processing timed out after {}s",
                self.timeout.as_secs_f64()
            )),
        }
    }

    async fn fail(
        &self,
        mut scan: Scan,
        message: String,
        started: Instant,
    ) -> Result<ScanStatus, ProcessError> {
        warn!(scan_id = %scan.id, error = %message, "scan failed");
        scan.fail(message)?;
        scan.processing_time_ms = Some(elapsed_ms(started));
        if let Err(e) = self.scans.update(&scan).await {
            error!(scan_id = %scan.id, error = %e, "could not record scan failure");
            return Err(ScanError::from(e).into());
        }
        Ok(ScanStatus::Failed)
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::compare::CompareService;
use crate::config::AppConfig;
use crate::db;
use crate::ocr::{OcrService, TesseractCli};
use crate::products::{
    OpenFoodFactsClient, PgProductRepository, ProductCatalog, ProductLookup, ProductRepository,
};
use crate::scans::{
    ImageRetentionJob, OcrWorkerPool, PgScanRepository, ScanProcessor, ScanQueue, ScanRepository,
    ScanService,
};
use crate::storage::{ImageStore, S3ImageStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub scans: ScanService,
    pub compare: CompareService,
}

/// Tasks that outlive a single request.
pub struct Background {
    workers: OcrWorkerPool,
    retention: JoinHandle<()>,
}

impl Background {
    /// Waits for the worker pool and the retention job to stop. The caller
    /// cancels the shared token first.
    pub async fn shutdown(self) {
        self.workers.shutdown().await;
        if let Err(e) = self.retention.await {
            error!(error = %e, "image retention job panicked");
        }
    }
}

impl AppState {
    pub async fn init(
        config: AppConfig,
        cancel: CancellationToken,
    ) -> anyhow::Result<(Self, Background)> {
        let config = Arc::new(config);

        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await;

        // S3 / MinIO
        let store = Arc::new(S3ImageStore::new(&config.storage).await?) as Arc<dyn ImageStore>;

        let scan_repo = Arc::new(PgScanRepository::new(pool.clone())) as Arc<dyn ScanRepository>;
        let product_repo =
            Arc::new(PgProductRepository::new(pool)) as Arc<dyn ProductRepository>;
        let lookup =
            Arc::new(OpenFoodFactsClient::new(&config.off_base_url)?) as Arc<dyn ProductLookup>;
        let catalog = ProductCatalog::new(product_repo.clone(), lookup);

        let (queue, rx) = ScanQueue::bounded(config.worker.queue_capacity);
        let scans = ScanService::new(
            scan_repo.clone(),
            product_repo.clone(),
            catalog,
            store.clone(),
            queue,
            config.storage.presign_ttl_secs,
        );

        let compare = CompareService::new(product_repo.clone(), scan_repo.clone());

        let ocr = OcrService::new(
            store.clone(),
            Arc::new(TesseractCli::from_config(&config.worker)),
        );
        let processor =
            ScanProcessor::new(scan_repo.clone(), product_repo, ocr, config.worker.timeout());
        let workers = OcrWorkerPool::start(config.worker.workers, rx, processor, cancel.clone());

        let retention =
            ImageRetentionJob::new(config.cleanup.clone(), scan_repo, store).spawn(cancel);

        Ok((Self { config, scans, compare }, Background { workers, retention }))
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::Harness::new().state
    }
}

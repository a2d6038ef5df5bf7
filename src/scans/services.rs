use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dto::{total_pages, PaginatedScans, Pagination, ScanSummary, ScanUploadAck, ScanView};
use super::queue::ScanQueue;
use super::repo::ScanRepository;
use super::repo_types::{Scan, ScanStatus};
use crate::error::{RepoError, ScanError};
use crate::products::{LookupError, ProductCatalog, ProductRepository};
use crate::storage::{scan_object_key, ImageStore};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

pub struct NewScan {
    pub user_id: Option<Uuid>,
    pub image: Option<UploadedImage>,
    pub store_image: bool,
    pub barcode: Option<String>,
}

#[derive(Clone)]
pub struct ScanService {
    scans: Arc<dyn ScanRepository>,
    products: Arc<dyn ProductRepository>,
    catalog: ProductCatalog,
    store: Arc<dyn ImageStore>,
    queue: ScanQueue,
    presign_ttl_secs: u64,
}

pub fn parse_id(raw: &str) -> Result<Uuid, ScanError> {
    Uuid::parse_str(raw).map_err(|_| ScanError::InvalidInput(format!("invalid scan id {raw:?}")))
}

fn validate(new: &NewScan) -> Result<(), ScanError> {
    if let Some(img) = &new.image {
        if !ALLOWED_CONTENT_TYPES.contains(&img.content_type.as_str()) {
            return Err(ScanError::InvalidInput(
                "invalid file type, allowed: JPEG, PNG, WebP".into(),
            ));
        }
        if img.bytes.is_empty() {
            return Err(ScanError::InvalidInput("image is empty".into()));
        }
        if img.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ScanError::InvalidInput("image exceeds 10 MiB".into()));
        }
    }
    let processable = new.barcode.is_some() || (new.image.is_some() && new.store_image);
    if !processable {
        return Err(ScanError::InvalidInput(
            "a barcode or a stored image is required".into(),
        ));
    }
    Ok(())
}

impl ScanService {
    pub fn new(
        scans: Arc<dyn ScanRepository>,
        products: Arc<dyn ProductRepository>,
        catalog: ProductCatalog,
        store: Arc<dyn ImageStore>,
        queue: ScanQueue,
        presign_ttl_secs: u64,
    ) -> Self {
        Self {
            scans,
            products,
            catalog,
            store,
            queue,
            presign_ttl_secs,
        }
    }

    /// Records a scan and resolves it by barcode when possible, otherwise
    /// queues it for recognition. Never waits on the recognition path.
    #[instrument(skip(self, new), fields(user_id = ?new.user_id))]
    pub async fn create_scan(&self, mut new: NewScan) -> Result<ScanUploadAck, ScanError> {
        new.barcode = new
            .barcode
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        validate(&new)?;

        let image_ref = match new.image.take().filter(|_| new.store_image) {
            Some(img) => {
                let key = scan_object_key(new.user_id, &img.filename, &img.content_type);
                self.store
                    .put_object(&key, img.bytes, &img.content_type)
                    .await
                    .map_err(ScanError::Storage)?;
                debug!(%key, "scan image uploaded");
                Some(key)
            }
            None => None,
        };

        let mut scan = Scan::new(new.user_id, new.barcode.clone(), image_ref);

        if let Some(barcode) = &new.barcode {
            match self.catalog.get_by_barcode(barcode).await {
                Ok(product) => {
                    scan.complete(
                        product.id,
                        None,
                        product.highlights.clone(),
                        product.insights.clone(),
                    )?;
                    scan.nutri_score = product.nutri_score;
                    scan.nutri_score_value = product.nutri_score_value;
                    info!(scan_id = %scan.id, product_id = %product.id, "scan completed by barcode");
                }
                Err(LookupError::NotFound) => {
                    debug!(scan_id = %scan.id, %barcode, "barcode unknown, falling back to recognition");
                }
                Err(e) => {
                    warn!(scan_id = %scan.id, %barcode, error = %e, "barcode lookup failed, falling back to recognition");
                }
            }
        }

        let enqueue = scan.status == ScanStatus::Pending && scan.stored_image().is_some();

        if let Err(e) = self.scans.create(&scan).await {
            if let Some(key) = scan.image_ref.as_deref() {
                if let Err(del) = self.store.delete_object(key).await {
                    warn!(%key, error = %del, "failed to remove orphaned scan image");
                }
            }
            return Err(e.into());
        }

        if enqueue {
            self.queue.enqueue(scan.id);
        }

        let image_url = self.presign(&scan).await;
        Ok(ScanUploadAck {
            id: scan.id,
            status: scan.status,
            image_url,
            created_at: scan.created_at,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_scan_by_id(&self, id: Uuid) -> Result<ScanView, ScanError> {
        let scan = self.scans.find_by_id(id).await?;
        let product = match scan.product_id {
            Some(pid) => match self.products.find_by_id(pid).await {
                Ok(p) => Some(p),
                Err(RepoError::NotFound) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        let image_url = self.presign(&scan).await;
        Ok(ScanView::build(scan, product, image_url))
    }

    #[instrument(skip(self))]
    pub async fn get_user_scans(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<PaginatedScans, ScanError> {
        let page = page.normalized();
        let (scans, total) = self
            .scans
            .find_by_user(user_id, page.offset(), page.limit)
            .await?;
        Ok(PaginatedScans {
            scans: scans.into_iter().map(ScanSummary::from).collect(),
            total,
            page: page.page,
            limit: page.limit,
            total_pages: total_pages(total, page.limit),
        })
    }

    /// Anonymous scans may be deleted by any authenticated caller.
    #[instrument(skip(self))]
    pub async fn delete_scan(&self, id: Uuid, user_id: Uuid) -> Result<(), ScanError> {
        let scan = self.scans.find_by_id(id).await?;
        if scan.user_id.is_some_and(|owner| owner != user_id) {
            return Err(ScanError::Forbidden);
        }
        if let Some(key) = scan.stored_image() {
            if let Err(e) = self.store.delete_object(key).await {
                warn!(scan_id = %id, error = %e, "failed to delete scan image");
            }
        }
        self.scans.delete(id).await?;
        info!(scan_id = %id, "scan deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_scan_image_url(&self, id: Uuid) -> Result<String, ScanError> {
        let scan = self.scans.find_by_id(id).await?;
        let key = scan.stored_image().ok_or(ScanError::NoImage)?;
        self.store
            .presign_get(key, self.presign_ttl_secs)
            .await
            .map_err(ScanError::Storage)
    }

    async fn presign(&self, scan: &Scan) -> Option<String> {
        let key = scan.stored_image()?;
        match self.store.presign_get(key, self.presign_ttl_secs).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(scan_id = %scan.id, error = %e, "failed to presign scan image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::ProductSource;
    use crate::testing::{jpeg, sample_product, Harness};

    fn upload(user_id: Option<Uuid>, barcode: Option<&str>) -> NewScan {
        NewScan {
            user_id,
            image: Some(jpeg()),
            store_image: true,
            barcode: barcode.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn known_barcode_completes_without_queueing() {
        let h = Harness::new();
        h.lookup.set(sample_product("8991002101234"));

        let ack = h.scans_svc.create_scan(upload(None, Some("8991002101234"))).await.unwrap();
        assert_eq!(ack.status, ScanStatus::Completed);
        assert!(ack.image_url.is_some());
        assert!(h.queue.is_empty());

        let scan = h.scans.get(ack.id).unwrap();
        let product = h.products.find_by_barcode("8991002101234").await.unwrap();
        assert_eq!(scan.product_id, Some(product.id));
        assert_eq!(product.source, ProductSource::OpenFoodFacts);
        assert_eq!(scan.nutri_score, product.nutri_score);
        assert_eq!(h.products.len(), 1);
    }

    #[tokio::test]
    async fn image_without_barcode_stays_pending_and_is_queued() {
        let h = Harness::new();
        let owner = Uuid::new_v4();

        let ack = h.scans_svc.create_scan(upload(Some(owner), None)).await.unwrap();
        assert_eq!(ack.status, ScanStatus::Pending);
        assert_eq!(h.queue_rx.recv().await, Some(ack.id));

        let scan = h.scans.get(ack.id).unwrap();
        let key = scan.image_ref.unwrap();
        assert!(key.starts_with(&format!("scans/{owner}/")));
        assert!(h.store.contains(&key));
    }

    #[tokio::test]
    async fn unknown_barcode_falls_back_to_queue() {
        let h = Harness::new();
        let ack = h.scans_svc.create_scan(upload(None, Some("000"))).await.unwrap();
        assert_eq!(ack.status, ScanStatus::Pending);
        assert_eq!(h.queue_rx.recv().await, Some(ack.id));
    }

    #[tokio::test]
    async fn uncached_product_is_never_linked() {
        let h = Harness::new();
        h.lookup.set(sample_product("777"));
        h.products.fail_writes();

        let ack = h.scans_svc.create_scan(upload(None, Some("777"))).await.unwrap();
        assert_eq!(ack.status, ScanStatus::Pending);
        assert_eq!(h.queue_rx.recv().await, Some(ack.id));

        let scan = h.scans.get(ack.id).unwrap();
        assert_eq!(scan.product_id, None);
        assert_eq!(scan.nutri_score, None);
        assert_eq!(h.products.len(), 0);
    }

    #[tokio::test]
    async fn full_queue_leaves_scan_pending() {
        let h = Harness::with_queue_capacity(1);
        let first = h.scans_svc.create_scan(upload(None, None)).await.unwrap();
        let second = h.scans_svc.create_scan(upload(None, None)).await.unwrap();

        assert_eq!(h.queue.len(), 1);
        assert_eq!(h.queue_rx.recv().await, Some(first.id));
        assert!(h.queue.is_empty());
        assert_eq!(h.scans.get(second.id).unwrap().status, ScanStatus::Pending);
    }

    #[tokio::test]
    async fn invalid_uploads_have_no_side_effects() {
        let h = Harness::new();
        let mut bad_type = upload(None, None);
        bad_type.image.as_mut().unwrap().content_type = "image/gif".into();
        let mut too_big = upload(None, None);
        too_big.image.as_mut().unwrap().bytes = Bytes::from(vec![0u8; MAX_IMAGE_BYTES + 1]);
        let nothing = NewScan { user_id: None, image: None, store_image: true, barcode: Some("  ".into()) };
        let unstored = NewScan { store_image: false, ..upload(None, None) };

        for new in [bad_type, too_big, nothing, unstored] {
            let err = h.scans_svc.create_scan(new).await.unwrap_err();
            assert!(matches!(err, ScanError::InvalidInput(_)), "{err}");
        }
        assert_eq!(h.store.len(), 0);
        assert_eq!(h.scans.len(), 0);
    }

    #[tokio::test]
    async fn failed_persist_removes_uploaded_image() {
        let h = Harness::new();
        h.scans.fail_writes();
        let err = h.scans_svc.create_scan(upload(None, None)).await.unwrap_err();
        assert!(matches!(err, ScanError::Repo(_)));
        assert_eq!(h.store.len(), 0);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn view_joins_product_and_presigns_image() {
        let h = Harness::new();
        h.lookup.set(sample_product("123"));
        let ack = h.scans_svc.create_scan(upload(None, Some("123"))).await.unwrap();

        let view = h.scans_svc.get_scan_by_id(ack.id).await.unwrap();
        assert_eq!(view.product.unwrap().barcode, "123");
        assert!(view.image_url.unwrap().starts_with("https://fake.local/scans/anonymous/"));
        assert!(matches!(
            h.scans_svc.get_scan_by_id(Uuid::new_v4()).await,
            Err(ScanError::NotFound)
        ));
    }

    #[tokio::test]
    async fn user_scans_are_paginated() {
        let h = Harness::new();
        let owner = Uuid::new_v4();
        for _ in 0..3 {
            h.scans_svc.create_scan(upload(Some(owner), None)).await.unwrap();
        }
        h.scans_svc.create_scan(upload(None, None)).await.unwrap();

        let page = h
            .scans_svc
            .get_user_scans(owner, Pagination { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.scans.len(), 1);

        let page = h
            .scans_svc
            .get_user_scans(owner, Pagination { page: 0, limit: 1000 })
            .await
            .unwrap();
        assert_eq!((page.page, page.limit), (1, 10));
        assert_eq!(page.scans.len(), 3);
    }

    #[tokio::test]
    async fn delete_checks_ownership_and_removes_image() {
        let h = Harness::new();
        let owner = Uuid::new_v4();
        let ack = h.scans_svc.create_scan(upload(Some(owner), None)).await.unwrap();
        let key = h.scans.get(ack.id).unwrap().image_ref.unwrap();

        let err = h.scans_svc.delete_scan(ack.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ScanError::Forbidden));

        h.scans_svc.delete_scan(ack.id, owner).await.unwrap();
        assert!(h.scans.get(ack.id).is_none());
        assert!(!h.store.contains(&key));
    }

    #[tokio::test]
    async fn image_url_requires_stored_image() {
        let h = Harness::new();
        h.lookup.set(sample_product("555"));
        let ack = h
            .scans_svc
            .create_scan(NewScan { user_id: None, image: None, store_image: false, barcode: Some("555".into()) })
            .await
            .unwrap();
        let err = h.scans_svc.get_scan_image_url(ack.id).await.unwrap_err();
        assert!(matches!(err, ScanError::NoImage));
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(matches!(parse_id("not-a-uuid"), Err(ScanError::InvalidInput(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}

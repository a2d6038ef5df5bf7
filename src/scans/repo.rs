use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Scan, ScanRow};
use crate::error::RepoError;

#[async_trait]
pub trait ScanRepository: Send + Sync {
    async fn create(&self, scan: &Scan) -> Result<(), RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Scan, RepoError>;
    /// Newest first, together with the owner's total scan count.
    async fn find_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Scan>, i64), RepoError>;
    /// Scans created before `cutoff` that still hold a stored image, oldest first.
    async fn find_old_with_images(
        &self,
        cutoff: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Scan>, RepoError>;
    async fn update(&self, scan: &Scan) -> Result<(), RepoError>;
    /// Drops the image reference only, leaving status and results untouched.
    async fn clear_image(&self, id: Uuid) -> Result<(), RepoError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}

const SCAN_COLUMNS: &str = r#"
    id, user_id, product_id, barcode, image_ref, image_stored, status, ocr_raw,
    nutri_score, nutri_score_value, highlights, insights, processing_time_ms,
    error_message, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgScanRepository {
    db: PgPool,
}

impl PgScanRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn decode_all(rows: Vec<ScanRow>) -> Result<Vec<Scan>, RepoError> {
    rows.into_iter().map(Scan::try_from).collect()
}

#[async_trait]
impl ScanRepository for PgScanRepository {
    async fn create(&self, s: &Scan) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO scans (
                id, user_id, product_id, barcode, image_ref, image_stored, status, ocr_raw,
                nutri_score, nutri_score_value, highlights, insights, processing_time_ms,
                error_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(s.product_id)
        .bind(&s.barcode)
        .bind(&s.image_ref)
        .bind(s.image_stored)
        .bind(s.status.as_str())
        .bind(&s.ocr_raw)
        .bind(s.nutri_score.map(|g| g.as_str()))
        .bind(s.nutri_score_value)
        .bind(s.highlights.as_ref().map(Json))
        .bind(s.insights.as_ref().map(Json))
        .bind(s.processing_time_ms)
        .bind(&s.error_message)
        .bind(s.created_at)
        .bind(s.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Scan, RepoError> {
        let sql = format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = $1");
        let row = sqlx::query_as::<_, ScanRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(RepoError::NotFound)?;
        Scan::try_from(row)
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Scan>, i64), RepoError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scans WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        let sql = format!(
            "SELECT {SCAN_COLUMNS} FROM scans WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, ScanRow>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;
        Ok((decode_all(rows)?, total))
    }

    async fn find_old_with_images(
        &self,
        cutoff: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Scan>, RepoError> {
        let sql = format!(
            "SELECT {SCAN_COLUMNS} FROM scans \
             WHERE image_stored = TRUE AND image_ref IS NOT NULL AND created_at < $1 \
             ORDER BY created_at ASC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ScanRow>(&sql)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        decode_all(rows)
    }

    async fn update(&self, s: &Scan) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE scans
               SET product_id = $2, barcode = $3, image_ref = $4, image_stored = $5,
                   status = $6, ocr_raw = $7, nutri_score = $8, nutri_score_value = $9,
                   highlights = $10, insights = $11, processing_time_ms = $12,
                   error_message = $13, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(s.id)
        .bind(s.product_id)
        .bind(&s.barcode)
        .bind(&s.image_ref)
        .bind(s.image_stored)
        .bind(s.status.as_str())
        .bind(&s.ocr_raw)
        .bind(s.nutri_score.map(|g| g.as_str()))
        .bind(s.nutri_score_value)
        .bind(s.highlights.as_ref().map(Json))
        .bind(s.insights.as_ref().map(Json))
        .bind(s.processing_time_ms)
        .bind(&s.error_message)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn clear_image(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE scans
               SET image_ref = NULL, image_stored = FALSE, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM scans WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

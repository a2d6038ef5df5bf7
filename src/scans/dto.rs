use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Scan, ScanStatus};
use crate::nutrition::{Grade, Insight, NutrientHighlight, Nutrients};
use crate::products::Product;

#[derive(Debug, Serialize)]
pub struct ScanUploadAck {
    pub id: Uuid,
    pub status: ScanStatus,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
    pub source: crate::products::ProductSource,
}

#[derive(Debug, Serialize)]
pub struct ScanView {
    pub id: Uuid,
    pub status: ScanStatus,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub product: Option<ProductSummary>,
    pub nutrients: Option<Nutrients>,
    pub serving_size: Option<String>,
    pub nutri_score: Option<Grade>,
    pub nutri_score_value: Option<i32>,
    pub highlights: Vec<NutrientHighlight>,
    pub insights: Vec<Insight>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ScanView {
    /// Highlights and insights come from the scan snapshot when present,
    /// otherwise from the product.
    pub fn build(scan: Scan, product: Option<Product>, image_url: Option<String>) -> Self {
        let highlights = scan
            .highlights
            .or_else(|| product.as_ref().map(|p| p.highlights.clone()))
            .unwrap_or_default();
        let insights = scan
            .insights
            .or_else(|| product.as_ref().map(|p| p.insights.clone()))
            .unwrap_or_default();
        let nutri_score = scan.nutri_score.or(product.as_ref().and_then(|p| p.nutri_score));
        let nutri_score_value = scan
            .nutri_score_value
            .or(product.as_ref().and_then(|p| p.nutri_score_value));

        let (summary, nutrients, serving_size) = match product {
            Some(p) => (
                Some(ProductSummary {
                    id: p.id,
                    barcode: p.barcode,
                    name: p.name,
                    brand: p.brand,
                    source: p.source,
                }),
                Some(p.nutrients),
                p.serving_size,
            ),
            None => (None, None, None),
        };

        Self {
            id: scan.id,
            status: scan.status,
            barcode: scan.barcode,
            image_url,
            product: summary,
            nutrients,
            serving_size,
            nutri_score,
            nutri_score_value,
            highlights,
            insights,
            processing_time_ms: scan.processing_time_ms,
            error_message: scan.error_message,
            created_at: scan.created_at,
            updated_at: scan.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub id: Uuid,
    pub status: ScanStatus,
    pub barcode: Option<String>,
    pub product_id: Option<Uuid>,
    pub nutri_score: Option<Grade>,
    pub nutri_score_value: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Scan> for ScanSummary {
    fn from(s: Scan) -> Self {
        Self {
            id: s.id,
            status: s.status,
            barcode: s.barcode,
            product_id: s.product_id,
            nutri_score: s.nutri_score,
            nutri_score_value: s.nutri_score_value,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedScans {
    pub scans: Vec<ScanSummary>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

impl Pagination {
    /// Clamps page to at least 1 and resets an out-of-range limit.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: if (1..=100).contains(&self.limit) { self.limit } else { default_limit() },
        }
    }

    /// Saturates instead of overflowing for absurd page numbers; such a page
    /// is simply empty.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).max(0).saturating_mul(self.limit)
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{macros::format_description, OffsetDateTime};
use uuid::Uuid;

use crate::error::RepoError;
use crate::nutrition::{Grade, Insight, NutriScore, NutrientHighlight, Nutrients};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSource {
    #[serde(rename = "openfoodfacts")]
    OpenFoodFacts,
    OcrScan,
    Manual,
}

impl ProductSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductSource::OpenFoodFacts => "openfoodfacts",
            ProductSource::OcrScan => "ocr_scan",
            ProductSource::Manual => "manual",
        }
    }
}

impl fmt::Display for ProductSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductSource {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openfoodfacts" => Ok(ProductSource::OpenFoodFacts),
            "ocr_scan" => Ok(ProductSource::OcrScan),
            "manual" => Ok(ProductSource::Manual),
            other => Err(RepoError::Corrupt(format!("unknown product source {other:?}"))),
        }
    }
}

/// A nutrition record. Source of truth for nutrients, grade, highlights and
/// insights; scans only keep a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub source: ProductSource,
    pub nutrients: Nutrients,
    pub serving_size: Option<String>,
    pub nutri_score: Option<Grade>,
    pub nutri_score_value: Option<i32>,
    pub highlights: Vec<NutrientHighlight>,
    pub insights: Vec<Insight>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub struct OcrProductParts {
    pub nutrients: Nutrients,
    pub serving_size: Option<String>,
    pub score: NutriScore,
    pub highlights: Vec<NutrientHighlight>,
    pub insights: Vec<Insight>,
}

impl Product {
    pub fn ocr_barcode(scan_id: Uuid) -> String {
        format!("ocr-{scan_id}")
    }

    /// Product synthesized from a recognized label. Its barcode is derived
    /// from the scan id since the label carries none.
    pub fn from_ocr(scan_id: Uuid, parts: OcrProductParts) -> Self {
        let now = OffsetDateTime::now_utc();
        let stamp = now
            .format(format_description!("[day]-[month repr:short] [hour]:[minute]"))
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            barcode: Self::ocr_barcode(scan_id),
            name: format!("Scanned Product {stamp}"),
            brand: None,
            image_url: None,
            source: ProductSource::OcrScan,
            nutrients: parts.nutrients,
            serving_size: parts.serving_size,
            nutri_score: Some(parts.score.grade),
            nutri_score_value: Some(parts.score.score),
            highlights: parts.highlights,
            insights: parts.insights,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub source: String,
    pub nutrients: Json<Nutrients>,
    pub serving_size: Option<String>,
    pub nutri_score: Option<String>,
    pub nutri_score_value: Option<i32>,
    pub highlights: Json<Vec<NutrientHighlight>>,
    pub insights: Json<Vec<Insight>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepoError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        let nutri_score = r
            .nutri_score
            .as_deref()
            .map(str::parse::<Grade>)
            .transpose()
            .map_err(RepoError::Corrupt)?;
        Ok(Self {
            id: r.id,
            barcode: r.barcode,
            name: r.name,
            brand: r.brand,
            image_url: r.image_url,
            source: r.source.parse()?,
            nutrients: r.nutrients.0,
            serving_size: r.serving_size,
            nutri_score,
            nutri_score_value: r.nutri_score_value,
            highlights: r.highlights.0,
            insights: r.insights.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

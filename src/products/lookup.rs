//! External barcode lookup against the Open Food Facts product API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::repo_types::{Product, ProductSource};
use crate::nutrition::{self, Grade, Nutrients};

#[async_trait]
pub trait ProductLookup: Send + Sync {
    /// `Ok(None)` when the catalog has no product for the barcode.
    async fn by_barcode(&self, barcode: &str) -> anyhow::Result<Option<Product>>;
}

const USER_AGENT: &str = "NutriSnap - Server - Version 1.0";

#[derive(Clone)]
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn by_barcode(&self, barcode: &str) -> anyhow::Result<Option<Product>> {
        let url = format!("{}/{}.json", self.base_url, barcode);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetch {url}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(%barcode, "product not found upstream");
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("open food facts returned status {}", resp.status());
        }

        let body: OffResponse = resp.json().await.context("decode open food facts response")?;
        Ok(body.into_product(barcode))
    }
}

#[derive(Debug, Deserialize)]
struct OffResponse {
    #[serde(default)]
    status: Value,
    product: Option<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct OffProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    nutriments: OffNutriments,
    #[serde(default)]
    nutriscore_grade: Option<String>,
    #[serde(default)]
    nutriscore_score: Option<Value>,
    #[serde(default)]
    serving_size: Option<String>,
}

/// Per-100g values. Open Food Facts reports every mass in grams and may
/// encode numbers as strings.
#[derive(Debug, Default, Deserialize)]
struct OffNutriments {
    #[serde(rename = "energy-kcal_100g")]
    energy_kcal: Option<Value>,
    #[serde(rename = "proteins_100g")]
    proteins: Option<Value>,
    #[serde(rename = "carbohydrates_100g")]
    carbohydrates: Option<Value>,
    #[serde(rename = "sugars_100g")]
    sugars: Option<Value>,
    #[serde(rename = "fat_100g")]
    fat: Option<Value>,
    #[serde(rename = "saturated-fat_100g")]
    saturated_fat: Option<Value>,
    #[serde(rename = "trans-fat_100g")]
    trans_fat: Option<Value>,
    #[serde(rename = "fiber_100g")]
    fiber: Option<Value>,
    #[serde(rename = "sodium_100g")]
    sodium: Option<Value>,
    #[serde(rename = "salt_100g")]
    salt: Option<Value>,
    #[serde(rename = "cholesterol_100g")]
    cholesterol: Option<Value>,
    #[serde(rename = "vitamin-a_100g")]
    vitamin_a: Option<Value>,
    #[serde(rename = "vitamin-c_100g")]
    vitamin_c: Option<Value>,
    #[serde(rename = "calcium_100g")]
    calcium: Option<Value>,
    #[serde(rename = "iron_100g")]
    iron: Option<Value>,
    #[serde(rename = "potassium_100g")]
    potassium: Option<Value>,
}

impl OffNutriments {
    fn to_nutrients(&self) -> Nutrients {
        Nutrients {
            energy_kcal: number(&self.energy_kcal),
            protein_g: number(&self.proteins),
            carbohydrate_g: number(&self.carbohydrates),
            sugar_g: number(&self.sugars),
            fat_g: number(&self.fat),
            saturated_fat_g: number(&self.saturated_fat),
            trans_fat_g: number(&self.trans_fat),
            fiber_g: number(&self.fiber),
            sodium_mg: milligrams(&self.sodium),
            salt_g: number(&self.salt),
            cholesterol_mg: milligrams(&self.cholesterol),
            vitamin_a_iu: number(&self.vitamin_a),
            vitamin_c_mg: milligrams(&self.vitamin_c),
            calcium_mg: milligrams(&self.calcium),
            iron_mg: milligrams(&self.iron),
            potassium_mg: milligrams(&self.potassium),
        }
    }
}

impl OffResponse {
    fn found(&self) -> bool {
        match &self.status {
            Value::Number(n) => n.as_i64() == Some(1),
            Value::String(s) => s == "1",
            _ => false,
        }
    }

    fn into_product(self, barcode: &str) -> Option<Product> {
        if !self.found() {
            debug!(%barcode, status = %self.status, "product not found upstream");
            return None;
        }
        let p = self.product?;
        let nutrients = p.nutriments.to_nutrients();

        let upstream_grade = p.nutriscore_grade.as_deref().and_then(|g| match g.parse::<Grade>() {
            Ok(grade) => Some(grade),
            Err(e) => {
                warn!(%barcode, error = %e, "ignoring upstream nutri-score grade");
                None
            }
        });
        let local = nutrition::score(&nutrients);
        let (nutri_score, nutri_score_value) = match upstream_grade {
            Some(grade) => (grade, number(&p.nutriscore_score).map(|v| v.round() as i32)),
            None => (local.grade, Some(local.score)),
        };
        let (highlights, insights) = nutrition::analyze(&nutrients);

        let now = OffsetDateTime::now_utc();
        Some(Product {
            id: Uuid::new_v4(),
            barcode: barcode.to_string(),
            name: p.product_name.filter(|n| !n.is_empty()).unwrap_or_else(|| barcode.to_string()),
            brand: non_empty(p.brands),
            image_url: non_empty(p.image_url),
            source: ProductSource::OpenFoodFacts,
            nutrients,
            serving_size: non_empty(p.serving_size),
            nutri_score: Some(nutri_score),
            nutri_score_value,
            highlights,
            insights,
            created_at: now,
            updated_at: now,
        })
    }
}

fn number(v: &Option<Value>) -> Option<f64> {
    match v.as_ref()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn milligrams(v: &Option<Value>) -> Option<f64> {
    number(v).map(|g| g * 1000.0)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::nutrition::Grade;
use crate::products::Product;

/// Each side is a barcode or a scan id.
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub product_a: String,
    #[serde(default)]
    pub product_b: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    A,
    B,
    Tie,
    /// At least one side lacks the value.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientComparison {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_b: Option<f64>,
    pub unit: &'static str,
    /// `value_a - value_b`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    pub winner: Winner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComparedProduct {
    pub id: Uuid,
    pub name: String,
    pub barcode: String,
    pub nutri_score: Option<Grade>,
    pub image_url: Option<String>,
}

impl From<&Product> for ComparedProduct {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            barcode: p.barcode.clone(),
            nutri_score: p.nutri_score,
            image_url: p.image_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub product_a: ComparedProduct,
    pub product_b: ComparedProduct,
    pub comparisons: Vec<NutrientComparison>,
    pub winner: Winner,
    pub verdict: String,
}

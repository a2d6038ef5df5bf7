use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::dto::{ComparedProduct, CompareResponse, NutrientComparison, Winner};
use crate::error::RepoError;
use crate::nutrition::Nutrients;
use crate::products::{Product, ProductRepository};
use crate::scans::ScanRepository;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("product {0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl CompareError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CompareError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CompareError::NotFound(_) => StatusCode::NOT_FOUND,
            CompareError::Repo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CompareError> for (StatusCode, String) {
    fn from(e: CompareError) -> Self {
        let status = e.status_code();
        if status.is_server_error() {
            tracing::error!(error = %e, "compare request failed");
        }
        (status, e.to_string())
    }
}

#[derive(Clone)]
pub struct CompareService {
    products: Arc<dyn ProductRepository>,
    scans: Arc<dyn ScanRepository>,
}

impl CompareService {
    pub fn new(products: Arc<dyn ProductRepository>, scans: Arc<dyn ScanRepository>) -> Self {
        Self { products, scans }
    }

    #[instrument(skip(self))]
    pub async fn compare_products(&self, a: &str, b: &str) -> Result<CompareResponse, CompareError> {
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            return Err(CompareError::InvalidInput(
                "product_a and product_b are required".into(),
            ));
        }
        let product_a = self.find_product(a).await?.ok_or(CompareError::NotFound("A"))?;
        let product_b = self.find_product(b).await?.ok_or(CompareError::NotFound("B"))?;
        Ok(compare(&product_a, &product_b))
    }

    /// Barcode first, then the product linked to a scan with that id.
    async fn find_product(&self, identifier: &str) -> Result<Option<Product>, RepoError> {
        match self.products.find_by_barcode(identifier).await {
            Ok(p) => return Ok(Some(p)),
            Err(RepoError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let Ok(scan_id) = Uuid::parse_str(identifier) else {
            return Ok(None);
        };
        let scan = match self.scans.find_by_id(scan_id).await {
            Ok(scan) => scan,
            Err(RepoError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let Some(product_id) = scan.product_id else {
            debug!(%scan_id, status = %scan.status, "scan has no product yet");
            return Ok(None);
        };
        match self.products.find_by_id(product_id).await {
            Ok(p) => Ok(Some(p)),
            Err(RepoError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Side-by-side nutrient comparison. A better Nutri-Score decides the
/// winner; otherwise the side winning more nutrients does.
pub fn compare(a: &Product, b: &Product) -> CompareResponse {
    let comparisons = compare_nutrients(&a.nutrients, &b.nutrients);
    let (winner, verdict) = verdict(a, b, &comparisons);
    CompareResponse {
        product_a: ComparedProduct::from(a),
        product_b: ComparedProduct::from(b),
        comparisons,
        winner,
        verdict,
    }
}

fn compare_nutrients(a: &Nutrients, b: &Nutrients) -> Vec<NutrientComparison> {
    // (name, unit, a, b, lower is better)
    let rows = [
        ("Calories", "kcal", a.energy_kcal, b.energy_kcal, true),
        ("Protein", "g", a.protein_g, b.protein_g, false),
        ("Fat", "g", a.fat_g, b.fat_g, true),
        ("Saturated Fat", "g", a.saturated_fat_g, b.saturated_fat_g, true),
        ("Carbohydrate", "g", a.carbohydrate_g, b.carbohydrate_g, true),
        ("Sugar", "g", a.sugar_g, b.sugar_g, true),
        ("Fiber", "g", a.fiber_g, b.fiber_g, false),
        ("Sodium", "mg", a.sodium_mg, b.sodium_mg, true),
    ];
    rows.into_iter()
        .map(|(name, unit, va, vb, lower_better)| nutrient(name, unit, va, vb, lower_better))
        .collect()
}

fn nutrient(
    name: &'static str,
    unit: &'static str,
    value_a: Option<f64>,
    value_b: Option<f64>,
    lower_better: bool,
) -> NutrientComparison {
    let mut row = NutrientComparison {
        name,
        value_a,
        value_b,
        unit,
        difference: None,
        winner: Winner::Unknown,
        note: None,
    };
    let (Some(va), Some(vb)) = (value_a, value_b) else {
        return row;
    };
    row.difference = Some(va - vb);

    let (winner, better, worse) = match va.partial_cmp(&vb) {
        Some(std::cmp::Ordering::Less) if lower_better => (Winner::A, va, vb),
        Some(std::cmp::Ordering::Greater) if lower_better => (Winner::B, vb, va),
        Some(std::cmp::Ordering::Greater) => (Winner::A, va, vb),
        Some(std::cmp::Ordering::Less) => (Winner::B, vb, va),
        _ => {
            row.winner = Winner::Tie;
            return row;
        }
    };
    row.winner = winner;
    row.note = Some(if lower_better {
        format!("{:.0}% less {}", ((worse - better) / worse * 100.0).abs(), name.to_lowercase())
    } else {
        format!("{:.0}% more {}", ((better - worse) / better * 100.0).abs(), name.to_lowercase())
    });
    row
}

fn verdict(a: &Product, b: &Product, comparisons: &[NutrientComparison]) -> (Winner, String) {
    if let (Some(ga), Some(gb)) = (a.nutri_score, b.nutri_score) {
        if ga < gb {
            return (Winner::A, format!("{} is healthier with Nutri-Score {ga} vs {gb}", a.name));
        }
        if gb < ga {
            return (Winner::B, format!("{} is healthier with Nutri-Score {gb} vs {ga}", b.name));
        }
    }

    let wins = |side: Winner| comparisons.iter().filter(|c| c.winner == side).count();
    let (wins_a, wins_b) = (wins(Winner::A), wins(Winner::B));
    let total = comparisons.len();
    if wins_a > wins_b {
        (Winner::A, format!("{} wins {wins_a} of {total} nutrient categories", a.name))
    } else if wins_b > wins_a {
        (Winner::B, format!("{} wins {wins_b} of {total} nutrient categories", b.name))
    } else {
        (Winner::Tie, "Both products have a similar nutrition profile".to_string())
    }
}

use super::{Insight, InsightKind, Level, NutrientHighlight, Nutrients, Severity};

const SUGAR_HIGH_G: f64 = 22.5;
const SUGAR_LOW_G: f64 = 5.0;
const FAT_HIGH_G: f64 = 17.5;
const FAT_LOW_G: f64 = 3.0;
const SATURATED_FAT_HIGH_G: f64 = 5.0;
// >10g per 100g makes a solid food a good protein source
const PROTEIN_HIGH_G: f64 = 10.0;
// roughly 1.5g of salt
const SODIUM_HIGH_MG: f64 = 600.0;

/// Derives per-nutrient highlights and advisory insights.
///
/// Highlights come out in a fixed order: sugar, fat, saturated fat, protein,
/// sodium. Unknown nutrients produce nothing.
pub fn analyze(n: &Nutrients) -> (Vec<NutrientHighlight>, Vec<Insight>) {
    let mut highlights = Vec::new();
    let mut insights = Vec::new();

    if let Some(v) = n.sugar_g {
        if v > SUGAR_HIGH_G {
            highlights.push(highlight("Sugar", Level::High, v, "g", "High Sugar"));
            insights.push(warning("Limit Intake", "Content contains high level of sugar."));
        } else if v < SUGAR_LOW_G {
            highlights.push(highlight("Sugar", Level::Low, v, "g", "Low Sugar"));
        } else {
            highlights.push(highlight("Sugar", Level::Medium, v, "g", "Moderate Sugar"));
        }
    }

    if let Some(v) = n.fat_g {
        if v > FAT_HIGH_G {
            highlights.push(highlight("Fat", Level::High, v, "g", "High Fat"));
        } else if v < FAT_LOW_G {
            highlights.push(highlight("Fat", Level::Low, v, "g", "Low Fat"));
        }
    }

    if let Some(v) = n.saturated_fat_g {
        if v > SATURATED_FAT_HIGH_G {
            highlights.push(highlight(
                "Saturated Fat",
                Level::High,
                v,
                "g",
                "High Saturated Fat",
            ));
            insights.push(warning("Warning", "High in saturated fats/trans fats."));
        }
    }

    if let Some(v) = n.protein_g {
        if v > PROTEIN_HIGH_G {
            highlights.push(highlight("Protein", Level::High, v, "g", "High Protein"));
        }
    }

    if let Some(v) = n.sodium_mg {
        if v > SODIUM_HIGH_MG {
            highlights.push(highlight("Sodium", Level::High, v, "mg", "High Sodium"));
        }
    }

    (highlights, insights)
}

fn highlight(nutrient: &str, level: Level, value: f64, unit: &str, message: &str) -> NutrientHighlight {
    NutrientHighlight {
        nutrient: nutrient.to_string(),
        level,
        value,
        unit: unit.to_string(),
        message: message.to_string(),
    }
}

fn warning(title: &str, message: &str) -> Insight {
    Insight {
        kind: InsightKind::Health,
        title: title.to_string(),
        message: message.to_string(),
        severity: Severity::Warning,
    }
}

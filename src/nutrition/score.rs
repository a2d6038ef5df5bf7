//! Nutri-Score point system for solid foods.
//!
//! Fruit/vegetable points are not computed (an OCR'd label does not state
//! ingredient proportions) and always contribute zero. Protein points are
//! always subtracted: the reference algorithm stops counting protein when
//! negative points reach 11, this implementation does not.

use serde::{Deserialize, Serialize};

use super::{Grade, Nutrients};

const KCAL_TO_KJ: f64 = 4.184;

/// Upper bounds (inclusive) of each point band. A value above the last bound
/// scores the maximum.
const ENERGY_KJ_BANDS: [f64; 10] = [
    335.0, 670.0, 1005.0, 1340.0, 1675.0, 2010.0, 2345.0, 2680.0, 3015.0, 3350.0,
];
const SUGAR_G_BANDS: [f64; 10] = [4.5, 9.0, 13.5, 18.0, 22.5, 27.0, 31.0, 36.0, 40.0, 45.0];
const SATURATED_FAT_G_BANDS: [f64; 10] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
const SODIUM_MG_BANDS: [f64; 10] = [
    90.0, 180.0, 270.0, 360.0, 450.0, 540.0, 630.0, 720.0, 810.0, 900.0,
];
const FIBER_G_BANDS: [f64; 5] = [0.9, 1.9, 2.8, 3.7, 4.7];
const PROTEIN_G_BANDS: [f64; 5] = [1.6, 3.2, 4.8, 6.4, 8.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutriScore {
    pub grade: Grade,
    pub score: i32,
}

/// Grades a nutrient set. Unknown nutrients contribute zero points.
pub fn score(n: &Nutrients) -> NutriScore {
    let score = negative_points(n) - positive_points(n);
    NutriScore {
        grade: grade_for(score),
        score,
    }
}

pub fn negative_points(n: &Nutrients) -> i32 {
    band_points(n.energy_kcal.map(|kcal| kcal * KCAL_TO_KJ), &ENERGY_KJ_BANDS)
        + band_points(n.sugar_g, &SUGAR_G_BANDS)
        + band_points(n.saturated_fat_g, &SATURATED_FAT_G_BANDS)
        + band_points(n.sodium_mg, &SODIUM_MG_BANDS)
}

pub fn positive_points(n: &Nutrients) -> i32 {
    band_points(n.fiber_g, &FIBER_G_BANDS) + band_points(n.protein_g, &PROTEIN_G_BANDS)
}

pub fn grade_for(score: i32) -> Grade {
    match score {
        i32::MIN..=-1 => Grade::A,
        0..=2 => Grade::B,
        3..=10 => Grade::C,
        11..=18 => Grade::D,
        _ => Grade::E,
    }
}

fn band_points(value: Option<f64>, bands: &[f64]) -> i32 {
    value.map_or(0, |v| bands.iter().take_while(|&&bound| v > bound).count() as i32)
}

//! Keyword-anchored extraction of nutrient values from recognized label text.
//!
//! Labels arrive in English or Indonesian. Every nutrient has an ordered list of
//! synonyms, most specific first; the first synonym followed by a parseable
//! number wins.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

use super::Nutrients;

/// Maximum number of characters allowed between a keyword and its value. The
/// gap holds only spaces and punctuation, so a keyword never reaches past the
/// next word to borrow another nutrient's number.
const MAX_VALUE_GAP: usize = 16;

/// Known misreadings of label keywords, applied after lower-casing.
/// No replacement may contain another entry's source text.
const OCR_CORRECTIONS: &[(&str, &str)] = &[
    ("iemak", "lemak"),
    ("lernak", "lemak"),
    ("1emak", "lemak"),
    ("lemek", "lemak"),
    ("gararn", "garam"),
    ("qaram", "garam"),
    ("9aram", "garam"),
    ("karbohidrai", "karbohidrat"),
    ("karbohidral", "karbohidrat"),
    ("karbohldrat", "karbohidrat"),
    ("karbonidrat", "karbohidrat"),
    ("protien", "protein"),
    ("prote1n", "protein"),
    ("natrlum", "natrium"),
    ("sodlum", "sodium"),
    ("energl", "energi"),
    ("kaiori", "kalori"),
];

#[derive(Debug, Clone, Copy)]
enum Field {
    EnergyKcal,
    Protein,
    Fat,
    SaturatedFat,
    TransFat,
    Carbohydrate,
    Sugar,
    Fiber,
    Sodium,
    Salt,
    Cholesterol,
    VitaminA,
    VitaminC,
    Calcium,
    Iron,
    Potassium,
}

impl Field {
    fn slot(self, n: &mut Nutrients) -> &mut Option<f64> {
        match self {
            Field::EnergyKcal => &mut n.energy_kcal,
            Field::Protein => &mut n.protein_g,
            Field::Fat => &mut n.fat_g,
            Field::SaturatedFat => &mut n.saturated_fat_g,
            Field::TransFat => &mut n.trans_fat_g,
            Field::Carbohydrate => &mut n.carbohydrate_g,
            Field::Sugar => &mut n.sugar_g,
            Field::Fiber => &mut n.fiber_g,
            Field::Sodium => &mut n.sodium_mg,
            Field::Salt => &mut n.salt_g,
            Field::Cholesterol => &mut n.cholesterol_mg,
            Field::VitaminA => &mut n.vitamin_a_iu,
            Field::VitaminC => &mut n.vitamin_c_mg,
            Field::Calcium => &mut n.calcium_mg,
            Field::Iron => &mut n.iron_mg,
            Field::Potassium => &mut n.potassium_mg,
        }
    }
}

const KEYWORDS: &[(Field, &[&str])] = &[
    (Field::EnergyKcal, &["energi total", "energy", "kalori", "calories", "kcal"]),
    (Field::Protein, &["protein", "proteine"]),
    (Field::Fat, &["lemak total", "total fat", "lemak", "fat", "lipides"]),
    (Field::SaturatedFat, &["lemak jenuh", "saturated fat", "sat fat"]),
    (Field::TransFat, &["lemak trans", "trans fat"]),
    (
        Field::Carbohydrate,
        &["karbohidrat total", "karbohidrat", "total carb", "carbohydrate", "carb", "glucides"],
    ),
    (Field::Sugar, &["total sugars", "gula", "sugars", "sugar"]),
    (Field::Fiber, &["serat pangan", "dietary fiber", "serat", "fiber"]),
    (Field::Sodium, &["natrium", "sodium"]),
    (Field::Salt, &["garam", "salt"]),
    (Field::Cholesterol, &["kolesterol", "cholesterol"]),
    (Field::VitaminA, &["vitamin a"]),
    (Field::VitaminC, &["vitamin c"]),
    (Field::Calcium, &["kalsium", "calcium"]),
    (Field::Iron, &["zat besi", "iron"]),
    (Field::Potassium, &["kalium", "potassium"]),
];

lazy_static! {
    static ref DIGIT_APOSTROPHE_RE: Regex = Regex::new(r"(\d)['’](\d)").unwrap();
    static ref SERVING_RE: Regex = Regex::new(
        r"(?:serving size|takaran saji).*?(\d+(?:[.,]\d+)?\s*(?:kg|ml|g))"
    )
    .unwrap();
    static ref FIELD_PATTERNS: Vec<(Field, Vec<Regex>)> = KEYWORDS
        .iter()
        .map(|(field, keys)| {
            let patterns = keys
                .iter()
                .map(|key| {
                    Regex::new(&format!(
                        r"{}[^0-9a-z]{{0,{}}}?(\d+(?:[.,]\d+)?)",
                        regex::escape(key),
                        MAX_VALUE_GAP
                    ))
                    .unwrap()
                })
                .collect();
            (*field, patterns)
        })
        .collect();
}

/// Lower-cases the text, flattens recognition artifacts and fixes known misreadings.
///
/// Normalizing already-normalized text returns it unchanged.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_lowercase().replace(['|', '\n', '\r'], " ");

    for &(wrong, right) in OCR_CORRECTIONS {
        if text.contains(wrong) {
            text = text.replace(wrong, right);
        }
    }

    // Replacement is non-overlapping, so "1'2'3" needs a second pass.
    loop {
        let fixed = DIGIT_APOSTROPHE_RE.replace_all(&text, "${1}.${2}");
        if let Cow::Borrowed(_) = fixed {
            break;
        }
        text = fixed.into_owned();
    }
    text
}

/// Extracts the nutrient set and serving size from raw recognized text.
///
/// Never fails: anything that cannot be found or parsed is left unset.
pub fn parse_label(raw: &str) -> (Nutrients, Option<String>) {
    let text = normalize(raw);

    let serving_size = SERVING_RE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<String>());

    let mut nutrients = Nutrients::default();
    for (field, patterns) in FIELD_PATTERNS.iter() {
        if let Some(value) = patterns.iter().find_map(|re| first_value(re, &text)) {
            *field.slot(&mut nutrients) = Some(value);
        }
    }

    (nutrients, serving_size)
}

fn first_value(re: &Regex, text: &str) -> Option<f64> {
    let caps = re.captures(text)?;
    caps.get(1)?.as_str().replacen(',', ".", 1).parse::<f64>().ok()
}

//! Unit-of-measure classification and conversion tables.
//!
//! Tokens are matched after trimming, lowercasing and stripping a trailing
//! period, so "LB.", "lb" and "Lbs" all land in the same bucket. Unknown
//! units never fail a conversion; weight falls back to pounds and volume
//! to milliliters, the dominant units on real vendor invoices.

use crate::domain::UnitKind;

pub const GRAMS_PER_KG: f64 = 1000.0;
pub const GRAMS_PER_LB: f64 = 453.592;
pub const GRAMS_PER_OZ: f64 = 28.3495;

pub const ML_PER_L: f64 = 1000.0;
pub const ML_PER_GAL: f64 = 3785.41;
pub const ML_PER_QT: f64 = 946.353;
pub const ML_PER_PT: f64 = 473.176;
pub const ML_PER_FLOZ: f64 = 29.5735;

const WEIGHT_TOKENS: &[&str] = &[
    "kg", "kgs", "kilo", "kilos", "kilogram", "kilograms", "g", "gr", "gram", "grams", "lb", "lbs",
    "pound", "pounds", "#", "oz", "ounce", "ounces",
];

const VOLUME_TOKENS: &[&str] = &[
    "ml", "mls", "milliliter", "milliliters", "l", "lt", "ltr", "liter", "liters", "litre",
    "litres", "gal", "gallon", "gallons", "qt", "quart", "quarts", "pt", "pint", "pints", "floz",
    "fl oz", "fl. oz",
];

const COUNT_TOKENS: &[&str] = &[
    "ea", "each", "ct", "count", "pc", "pcs", "piece", "pieces", "un", "unit", "units", "dz",
    "dozen",
];

const CONTAINER_TOKENS: &[&str] = &[
    "cs", "case", "cases", "bx", "box", "boxes", "pk", "pack", "packs", "bg", "bag", "bags", "rl",
    "roll", "rolls", "ctn", "carton", "cartons", "pl", "pail", "pails", "dr", "drum", "tub", "jug",
    "btl", "bottle", "bottles", "can", "cans", "tray", "trays", "sleeve", "sleeves", "bdl",
    "bundle",
];

fn normalize_token(unit: &str) -> String {
    unit.trim().trim_end_matches('.').to_lowercase()
}

/// Classify a unit token into its broad measurement class
pub fn classify_unit(unit: &str) -> UnitKind {
    let token = normalize_token(unit);
    if token.is_empty() {
        return UnitKind::Unknown;
    }
    if WEIGHT_TOKENS.contains(&token.as_str()) {
        UnitKind::Weight
    } else if VOLUME_TOKENS.contains(&token.as_str()) {
        UnitKind::Volume
    } else if COUNT_TOKENS.contains(&token.as_str()) {
        UnitKind::Count
    } else if CONTAINER_TOKENS.contains(&token.as_str()) {
        UnitKind::Container
    } else {
        UnitKind::Unknown
    }
}

/// Collapse spelled-out and plural unit tokens to a canonical short form.
/// Unrecognized tokens pass through lowercased.
pub fn canonical_unit(unit: &str) -> String {
    let token = normalize_token(unit);
    let canonical = match token.as_str() {
        "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" => "kg",
        "gr" | "gram" | "grams" => "g",
        "lbs" | "pound" | "pounds" | "#" => "lb",
        "ounce" | "ounces" => "oz",
        "mls" | "milliliter" | "milliliters" => "ml",
        "lt" | "ltr" | "liter" | "liters" | "litre" | "litres" => "l",
        "gallon" | "gallons" => "gal",
        "quart" | "quarts" => "qt",
        "pint" | "pints" => "pt",
        "fl oz" | "fl. oz" => "floz",
        other => other,
    };
    canonical.to_string()
}

fn grams_factor(unit: &str) -> f64 {
    match canonical_unit(unit).as_str() {
        "g" => 1.0,
        "kg" => GRAMS_PER_KG,
        "oz" => GRAMS_PER_OZ,
        // lb, plus anything unrecognized
        _ => GRAMS_PER_LB,
    }
}

fn ml_factor(unit: &str) -> f64 {
    match canonical_unit(unit).as_str() {
        "l" => ML_PER_L,
        "gal" => ML_PER_GAL,
        "qt" => ML_PER_QT,
        "pt" => ML_PER_PT,
        "floz" => ML_PER_FLOZ,
        // ml, plus anything unrecognized
        _ => 1.0,
    }
}

/// Convert a weight in the given unit to grams
pub fn to_grams(value: f64, unit: &str) -> f64 {
    round4(value * grams_factor(unit))
}

/// Convert a volume in the given unit to milliliters
pub fn to_ml(value: f64, unit: &str) -> f64 {
    round4(value * ml_factor(unit))
}

/// Convert a weight in grams to the given unit
pub fn grams_to(value: f64, unit: &str) -> f64 {
    round4(value / grams_factor(unit))
}

/// Convert a volume in milliliters to the given unit
pub fn ml_to(value: f64, unit: &str) -> f64 {
    round4(value / ml_factor(unit))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

//! Normalized cost computation.
//!
//! Once a line has a stated total and an extracted weight, volume or
//! count, the cost is normalized into comparable units: per gram, per
//! kilogram and per pound for weight lines; per milliliter and per liter
//! for volume lines; per unit otherwise. Per-gram and per-milliliter
//! figures keep six decimals since unit costs of bulk goods run well
//! below a cent.

use crate::domain::{PricingResult, PricingType, WeightExtraction};
use crate::observability::metrics as obs;
use crate::pipeline::processing::units::{round2, round4, round6, GRAMS_PER_KG, GRAMS_PER_LB, ML_PER_L};

pub fn compute_pricing(
    pricing_type: PricingType,
    total_price: Option<f64>,
    weight: &WeightExtraction,
    quantity: Option<f64>,
) -> PricingResult {
    let total = match total_price {
        Some(t) if t > 0.0 => t,
        // zero, missing or negative totals cannot be normalized
        _ => {
            obs::pricing::unavailable(pricing_type.as_str());
            return PricingResult::Unknown;
        }
    };

    let result = match pricing_type {
        PricingType::Weight => match weight.total_grams {
            Some(grams) if grams > 0.0 => {
                let per_gram = total / grams;
                PricingResult::Weight {
                    price_per_g: round6(per_gram),
                    price_per_kg: round4(per_gram * GRAMS_PER_KG),
                    price_per_lb: round4(per_gram * GRAMS_PER_LB),
                }
            }
            _ => PricingResult::Unknown,
        },
        PricingType::Volume => match weight.total_ml {
            Some(ml) if ml > 0.0 => {
                let per_ml = total / ml;
                PricingResult::Volume {
                    price_per_ml: round6(per_ml),
                    price_per_l: round4(per_ml * ML_PER_L),
                }
            }
            _ => PricingResult::Unknown,
        },
        PricingType::Unit => match quantity {
            Some(qty) if qty > 0.0 => PricingResult::Unit {
                price_per_unit: round2(total / qty),
            },
            _ => PricingResult::Unknown,
        },
    };

    if result.is_valid() {
        obs::pricing::computed(pricing_type.as_str());
    } else {
        obs::pricing::unavailable(pricing_type.as_str());
    }
    result
}

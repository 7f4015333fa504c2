//! Line-total math checking.
//!
//! Two candidate formulas can explain a stated line total: quantity x
//! unit price, or extracted weight x unit price. Vendors are inconsistent
//! about which one they billed with, so unless a unit token or profile
//! flag forces a choice, the formula that lands closest to the stated
//! total wins and the gap is scored into a confidence band.

use crate::domain::{MathFormula, MathValidation, UnitKind};
use crate::observability::metrics as obs;
use crate::pipeline::processing::units::round2;

/// Everything the math check needs from the surrounding pipeline
pub struct MathInput {
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    /// Total extracted weight in its native unit, when one exists
    pub weight_total: Option<f64>,
    /// Class of the line's unit-of-measure token
    pub unit_kind: UnitKind,
    /// Vendor bills by weight; forces the weight formula when possible
    pub bills_by_weight: bool,
    /// Allowed expected-vs-actual gap in currency
    pub tolerance: f64,
}

/// Score an absolute expected-vs-actual gap into a confidence band
fn band(difference: f64) -> u8 {
    if difference <= 1e-9 {
        100
    } else if difference <= 0.01 + 1e-9 {
        95
    } else if difference <= 0.02 + 1e-9 {
        90
    } else if difference <= 0.10 + 1e-9 {
        70
    } else if difference <= 1.00 + 1e-9 {
        50
    } else {
        0
    }
}

pub fn validate_math(input: &MathInput) -> MathValidation {
    let unit_price = input.unit_price.unwrap_or(0.0);
    let actual = input.total_price.unwrap_or(0.0);

    // Nothing priced on this line: trivially consistent
    if unit_price.abs() < f64::EPSILON && actual.abs() < f64::EPSILON {
        let result = MathValidation {
            formula: MathFormula::None,
            expected: 0.0,
            actual: 0.0,
            difference: 0.0,
            tolerance: input.tolerance,
            confidence: 100,
            valid: true,
        };
        obs::math::check(true);
        return result;
    }

    let unit_expected = round2(input.quantity.unwrap_or(0.0) * unit_price);
    let weight_expected = input.weight_total.map(|w| round2(w * unit_price));

    let (formula, expected) = choose_formula(input, unit_expected, weight_expected, actual);
    let difference = round2((expected - actual).abs());
    let confidence = band(difference);
    let valid = difference <= input.tolerance + 1e-9;

    obs::math::check(valid);
    obs::math::difference(difference);

    MathValidation {
        formula,
        expected,
        actual,
        difference,
        tolerance: input.tolerance,
        confidence,
        valid,
    }
}

fn choose_formula(
    input: &MathInput,
    unit_expected: f64,
    weight_expected: Option<f64>,
    actual: f64,
) -> (MathFormula, f64) {
    if let Some(weight_expected) = weight_expected {
        // explicit override always wins
        if input.bills_by_weight {
            return (MathFormula::Weight, weight_expected);
        }
        match input.unit_kind {
            UnitKind::Weight | UnitKind::Volume => {
                return (MathFormula::Weight, weight_expected);
            }
            UnitKind::Count => return (MathFormula::Unit, unit_expected),
            _ => {}
        }
        // ambiguous: the formula closest to the stated total wins
        if (weight_expected - actual).abs() < (unit_expected - actual).abs() {
            return (MathFormula::Weight, weight_expected);
        }
        return (MathFormula::Unit, unit_expected);
    }
    (MathFormula::Unit, unit_expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MATH_TOLERANCE;

    fn base_input() -> MathInput {
        MathInput {
            quantity: Some(1.0),
            unit_price: None,
            total_price: None,
            weight_total: None,
            unit_kind: UnitKind::Unknown,
            bills_by_weight: false,
            tolerance: DEFAULT_MATH_TOLERANCE,
        }
    }

    #[test]
    fn zero_prices_are_trivially_valid() {
        let result = validate_math(&base_input());
        assert!(result.valid);
        assert_eq!(result.formula, MathFormula::None);
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn exact_unit_match_scores_full_confidence() {
        let result = validate_math(&MathInput {
            quantity: Some(4.0),
            unit_price: Some(24.99),
            total_price: Some(99.96),
            weight_total: Some(40.0),
            ..base_input()
        });
        assert_eq!(result.formula, MathFormula::Unit);
        assert_eq!(result.expected, 99.96);
        assert_eq!(result.difference, 0.0);
        assert_eq!(result.confidence, 100);
        assert!(result.valid);
    }

    #[test]
    fn weight_unit_token_forces_weight_formula() {
        // 2.43 kg at 8.99/kg, quantity field carries the weight
        let result = validate_math(&MathInput {
            quantity: Some(2.43),
            unit_price: Some(8.99),
            total_price: Some(21.85),
            weight_total: Some(2.43),
            unit_kind: UnitKind::Weight,
            ..base_input()
        });
        assert_eq!(result.formula, MathFormula::Weight);
        assert_eq!(result.expected, 21.85);
        assert!(result.valid);
    }

    #[test]
    fn billing_flag_forces_weight_formula() {
        let result = validate_math(&MathInput {
            quantity: Some(3.0),
            unit_price: Some(2.00),
            total_price: Some(20.00),
            weight_total: Some(10.0),
            bills_by_weight: true,
            ..base_input()
        });
        assert_eq!(result.formula, MathFormula::Weight);
        assert_eq!(result.expected, 20.00);
        assert!(result.valid);
    }

    #[test]
    fn closest_formula_wins_when_ambiguous() {
        // container unit: neither formula is forced
        let result = validate_math(&MathInput {
            quantity: Some(4.0),
            unit_price: Some(2.50),
            total_price: Some(25.00),
            weight_total: Some(10.0),
            unit_kind: UnitKind::Container,
            ..base_input()
        });
        assert_eq!(result.formula, MathFormula::Weight);
        assert_eq!(result.expected, 25.00);
    }

    #[test]
    fn mismatch_reports_banded_confidence() {
        let result = validate_math(&MathInput {
            quantity: Some(10.0),
            unit_price: Some(5.00),
            total_price: Some(47.97),
            ..base_input()
        });
        assert_eq!(result.formula, MathFormula::Unit);
        assert_eq!(result.expected, 50.00);
        assert_eq!(result.difference, 2.03);
        assert_eq!(result.confidence, 0);
        assert!(!result.valid);
    }

    #[test]
    fn confidence_bands_step_down_with_the_gap() {
        let with_total = |total: f64| {
            validate_math(&MathInput {
                quantity: Some(1.0),
                unit_price: Some(10.00),
                total_price: Some(total),
                ..base_input()
            })
        };
        assert_eq!(with_total(10.00).confidence, 100);
        assert_eq!(with_total(10.01).confidence, 95);
        assert_eq!(with_total(10.02).confidence, 90);
        assert_eq!(with_total(10.10).confidence, 70);
        assert_eq!(with_total(11.00).confidence, 50);
        assert_eq!(with_total(12.00).confidence, 0);
    }

    #[test]
    fn tolerance_bounds_validity_not_confidence() {
        let result = validate_math(&MathInput {
            quantity: Some(1.0),
            unit_price: Some(10.00),
            total_price: Some(10.02),
            ..base_input()
        });
        // within the default two-cent tolerance, but not a perfect match
        assert!(result.valid);
        assert_eq!(result.confidence, 90);

        let result = validate_math(&MathInput {
            quantity: Some(1.0),
            unit_price: Some(10.00),
            total_price: Some(10.03),
            ..base_input()
        });
        assert!(!result.valid);
    }
}

//! Three-tier validation gating.
//!
//! Every line is scored against three ordered gates: core fields
//! (description plus at least one price), middle-stage resolution
//! (weight, volume or boxing arithmetic when the pricing strategy needs
//! it) and pricing computability. Lines are never rejected outright; a
//! failed gate clears a flag and attaches a warning so a reviewer can
//! see exactly what is missing. Tier 1 is the only gate whose failure
//! raises an error-severity warning, since billing without it would be
//! guesswork.

use crate::constants::{
    CORE_CONFIDENCE_WEIGHT, MATH_CONFIDENCE_WEIGHT, MIDDLE_CONFIDENCE_WEIGHT,
};
use crate::domain::{
    ConfidenceLevel, LineWarning, MathFormula, MathValidation, ValidationSummary, WarningKind,
    WarningSeverity,
};
use crate::observability::metrics as obs;

/// Per-pipeline confidence signals feeding the overall blend.
/// `math` always comes from the math check; `middle` is the weight or
/// boxing confidence; `core` is the pipeline's own read on its base
/// fields.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInputs {
    pub math: u8,
    pub middle: u8,
    pub core: u8,
}

/// Everything the gates need to judge one line
pub struct GateContext<'a> {
    pub description_present: bool,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    /// Middle stage resolved whatever the pricing strategy requires
    pub format_resolved: bool,
    /// A normalized cost was computed
    pub pricing_valid: bool,
    pub math: &'a MathValidation,
    pub confidence: ConfidenceInputs,
    /// Warnings the handler accumulated before gating, in pipeline order
    pub warnings: Vec<LineWarning>,
}

/// Runs the fixed gate sequence over a prepared context
pub struct GateSequencer;

impl GateSequencer {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, ctx: GateContext<'_>) -> ValidationSummary {
        let mut problems = ctx.warnings;

        let any_price = ctx.unit_price.is_some() || ctx.total_price.is_some();
        let core_fields_present = ctx.description_present && any_price;
        if !core_fields_present {
            let missing = if !ctx.description_present && !any_price {
                "description and both price fields"
            } else if !ctx.description_present {
                "description"
            } else {
                "both price fields"
            };
            problems.push(LineWarning::error(
                WarningKind::MissingField,
                format!("Core fields unresolved: {missing}"),
            ));
        }

        let format_resolved = ctx.format_resolved;
        if !format_resolved {
            problems.push(LineWarning::warning(
                WarningKind::UnparsedFormat,
                "No weight, volume or pack arithmetic could be resolved for this line",
            ));
        }

        let pricing_computable = ctx.pricing_valid;
        if !pricing_computable {
            problems.push(LineWarning::warning(
                WarningKind::PricingUnavailable,
                "No normalized cost could be computed",
            ));
        }

        if !ctx.math.valid && ctx.math.formula != MathFormula::None {
            problems.push(LineWarning::warning(
                WarningKind::MathMismatch,
                format!(
                    "Expected {:.2} from the {} formula but the line states {:.2} (off by {:.2})",
                    ctx.math.expected,
                    ctx.math.formula.as_str(),
                    ctx.math.actual,
                    ctx.math.difference
                ),
            ));
        }

        if matches!(ctx.unit_price, Some(p) if p.abs() < f64::EPSILON) {
            problems.push(
                LineWarning::info(WarningKind::ZeroPrice, "Unit price is zero")
                    .with_field("unit_price"),
            );
        }
        if matches!(ctx.total_price, Some(p) if p.abs() < f64::EPSILON) {
            problems.push(
                LineWarning::info(WarningKind::ZeroPrice, "Total price is zero")
                    .with_field("total_price"),
            );
        }

        let overall = MATH_CONFIDENCE_WEIGHT * f64::from(ctx.confidence.math)
            + MIDDLE_CONFIDENCE_WEIGHT * f64::from(ctx.confidence.middle)
            + CORE_CONFIDENCE_WEIGHT * f64::from(ctx.confidence.core);
        let overall_confidence = overall.round().clamp(0.0, 100.0) as u8;
        let confidence_level = ConfidenceLevel::from_score(overall_confidence);

        if confidence_level == ConfidenceLevel::Critical {
            problems.push(LineWarning::warning(
                WarningKind::LowConfidence,
                format!("Overall confidence {overall_confidence} is in the critical band"),
            ));
        }

        let can_process = core_fields_present && format_resolved && pricing_computable;
        let can_bill = core_fields_present;

        obs::validation::line_gated(can_process);
        obs::validation::confidence(overall_confidence);

        let (errors, warnings): (Vec<_>, Vec<_>) = problems
            .into_iter()
            .partition(|w| w.severity == WarningSeverity::Error);

        ValidationSummary {
            core_fields_present,
            format_resolved,
            pricing_computable,
            can_process,
            can_bill,
            overall_confidence,
            confidence_level,
            warnings,
            errors,
        }
    }
}

impl Default for GateSequencer {
    fn default() -> Self {
        Self::new()
    }
}

//! Weight- and volume-priced pipeline.
//!
//! Food and supply lines are costed by how much product actually
//! arrived, so the pipeline's center of gravity is weight resolution.
//! The weight of a line can come from several places, tried in a fixed
//! order: catch-weight formats put the real weight in the quantity
//! field; a weight-class unit token means the quantity is the weight; a
//! vendor billing flag asserts the same; otherwise the parsed format
//! gives a per-case figure that multiplies out by quantity, with
//! description mining as the last resort.

use tracing::debug;

use crate::constants::{
    WEIGHT_FROM_DESCRIPTION_CONFIDENCE, WEIGHT_FROM_FORMAT_CONFIDENCE,
    WEIGHT_FROM_QUANTITY_CONFIDENCE,
};
use crate::domain::{
    ExtractedField, FlatLine, HandlerKind, LineClassification, LineWarning, ParsedFormat,
    PricingType, ProcessedLine, SourceKind, UnitKind, WarningKind, WeightExtraction,
};
use crate::fingerprint::line_fingerprint;
use crate::observability::metrics as obs;
use crate::pipeline::processing::format::{mine_description, parse_format};
use crate::pipeline::processing::handlers::{routing_trace, CoreFields, LineContext, LineHandler};
use crate::pipeline::processing::math::{validate_math, MathInput};
use crate::pipeline::processing::pricing::compute_pricing;
use crate::pipeline::processing::units::{canonical_unit, classify_unit, round4, to_grams, to_ml};
use crate::pipeline::processing::validation::{ConfidenceInputs, GateContext, GateSequencer};

pub struct SupplyHandler;

impl SupplyHandler {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the line's weight or volume, trying sources in priority
    /// order. Warnings for catch-weight handling are pushed as they
    /// arise.
    #[allow(clippy::too_many_arguments)]
    fn resolve_weight(
        &self,
        quantity: Option<f64>,
        quantity_source: SourceKind,
        unit_token: Option<&str>,
        unit_kind: UnitKind,
        parsed: &ParsedFormat,
        format_source: SourceKind,
        bills_by_weight: bool,
        warnings: &mut Vec<LineWarning>,
    ) -> WeightExtraction {
        let qty = quantity.unwrap_or(0.0);

        // Catch-weight: the quantity field carries the real shipped
        // weight; the format only names a nominal target
        if let ParsedFormat::ApproximateWeight {
            nominal_weight,
            unit,
        } = parsed
        {
            if qty > 0.0 {
                let total = round4(qty);
                warnings.push(
                    LineWarning::info(
                        WarningKind::ApproximateFormat,
                        format!(
                            "Catch-weight format (~{nominal_weight} {unit} nominal); billed weight {total} {unit} taken from the quantity field"
                        ),
                    )
                    .with_field("quantity"),
                );
                return WeightExtraction {
                    per_unit: None,
                    total: Some(total),
                    total_grams: Some(to_grams(total, unit)),
                    total_ml: None,
                    unit: unit.clone(),
                    source: quantity_source,
                    confidence: WEIGHT_FROM_QUANTITY_CONFIDENCE,
                    valid: true,
                    is_volume: false,
                };
            }
        }

        // A weight-class unit token means the quantity is itself a weight
        if unit_kind == UnitKind::Weight && qty > 0.0 {
            let unit = canonical_unit(unit_token.unwrap_or("lb"));
            let total = round4(qty);
            return WeightExtraction {
                per_unit: None,
                total: Some(total),
                total_grams: Some(to_grams(total, &unit)),
                total_ml: None,
                unit,
                source: quantity_source,
                confidence: WEIGHT_FROM_QUANTITY_CONFIDENCE,
                valid: true,
                is_volume: false,
            };
        }
        if unit_kind == UnitKind::Volume && qty > 0.0 {
            let unit = canonical_unit(unit_token.unwrap_or("ml"));
            let total = round4(qty);
            return WeightExtraction {
                per_unit: None,
                total: Some(total),
                total_grams: None,
                total_ml: Some(to_ml(total, &unit)),
                unit,
                source: quantity_source,
                confidence: WEIGHT_FROM_QUANTITY_CONFIDENCE,
                valid: true,
                is_volume: true,
            };
        }

        // Vendor-level assertion that quantity carries weight
        if bills_by_weight && qty > 0.0 {
            let unit = parsed
                .unit()
                .filter(|_| parsed.weight_per_case().is_some())
                .map(canonical_unit)
                .unwrap_or_else(|| "lb".to_string());
            let total = round4(qty);
            return WeightExtraction {
                per_unit: None,
                total: Some(total),
                total_grams: Some(to_grams(total, &unit)),
                total_ml: None,
                unit,
                source: quantity_source,
                confidence: WEIGHT_FROM_QUANTITY_CONFIDENCE,
                valid: true,
                is_volume: false,
            };
        }

        // Per-case weight from the format, multiplied out by quantity
        if let Some(per_case) = parsed.weight_per_case() {
            if per_case > 0.0 && qty > 0.0 {
                let unit = parsed
                    .unit()
                    .map(canonical_unit)
                    .unwrap_or_else(|| "lb".to_string());
                let total = round4(per_case * qty);
                let confidence = if format_source == SourceKind::Extracted {
                    WEIGHT_FROM_DESCRIPTION_CONFIDENCE
                } else {
                    WEIGHT_FROM_FORMAT_CONFIDENCE
                };
                return WeightExtraction {
                    per_unit: Some(round4(per_case)),
                    total: Some(total),
                    total_grams: Some(to_grams(total, &unit)),
                    total_ml: None,
                    unit,
                    source: format_source,
                    confidence,
                    valid: true,
                    is_volume: false,
                };
            }
        }

        // Per-case volume, same shape
        if let Some(per_case) = parsed.volume_per_case() {
            if per_case > 0.0 && qty > 0.0 {
                let unit = parsed
                    .unit()
                    .map(canonical_unit)
                    .unwrap_or_else(|| "ml".to_string());
                let total = round4(per_case * qty);
                let confidence = if format_source == SourceKind::Extracted {
                    WEIGHT_FROM_DESCRIPTION_CONFIDENCE
                } else {
                    WEIGHT_FROM_FORMAT_CONFIDENCE
                };
                return WeightExtraction {
                    per_unit: Some(round4(per_case)),
                    total: Some(total),
                    total_grams: None,
                    total_ml: Some(to_ml(total, &unit)),
                    unit,
                    source: format_source,
                    confidence,
                    valid: true,
                    is_volume: true,
                };
            }
        }

        WeightExtraction::invalid()
    }
}

impl Default for SupplyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineHandler for SupplyHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Supply
    }

    fn name(&self) -> &'static str {
        "supply"
    }

    fn process(&self, ctx: &LineContext<'_>) -> ProcessedLine {
        let mut warnings: Vec<LineWarning> = Vec::new();
        let fields = CoreFields::resolve(ctx);
        let bills_by_weight = ctx.profile.map(|p| p.bills_by_weight).unwrap_or(false);

        let unit_kind = fields
            .unit
            .get()
            .map(|u| classify_unit(u))
            .unwrap_or(UnitKind::Unknown);
        if fields.unit.is_present() && unit_kind == UnitKind::Unknown {
            warnings.push(
                LineWarning::info(
                    WarningKind::UnknownUnit,
                    format!(
                        "Unit token '{}' is not in any known table",
                        fields.unit.get().map(String::as_str).unwrap_or_default()
                    ),
                )
                .with_field("unit"),
            );
        }

        // Parse the format field; fall back to mining the description
        let mut format_field = fields.format.clone();
        let mut parsed = format_field
            .get()
            .map(|f| parse_format(f))
            .unwrap_or(ParsedFormat::Unknown);
        if format_field.is_present() && !parsed.is_known() {
            warnings.push(
                LineWarning::warning(
                    WarningKind::UnparsedFormat,
                    format!(
                        "Format '{}' did not match any known pattern",
                        format_field.get().map(String::as_str).unwrap_or_default()
                    ),
                )
                .with_field("format"),
            );
        }
        if !parsed.is_known() {
            if let Some(mined) = fields.description.get().and_then(|d| mine_description(d)) {
                debug!(
                    matched = %mined.matched,
                    per_unit = mined.per_unit,
                    "recovered packaging notation from description"
                );
                parsed = mined.parsed.clone();
                format_field = ExtractedField::resolved(
                    mined.matched.clone(),
                    SourceKind::Extracted,
                    SourceKind::Extracted.base_confidence(),
                );
                warnings.push(
                    LineWarning::info(
                        WarningKind::LowConfidence,
                        format!("Packaging notation '{}' mined from description text", mined.matched),
                    )
                    .with_field("format"),
                );
            }
        }
        obs::format::parsed(parsed.format_type());

        let weight = self.resolve_weight(
            fields.quantity.value,
            fields.quantity.source,
            fields.unit.get().map(String::as_str),
            unit_kind,
            &parsed,
            format_field.source,
            bills_by_weight,
            &mut warnings,
        );

        let math = validate_math(&MathInput {
            quantity: fields.quantity.value,
            unit_price: fields.unit_price.value,
            total_price: fields.total_price.value,
            weight_total: weight.total,
            unit_kind,
            bills_by_weight,
            tolerance: ctx.options.math_tolerance,
        });

        // Weight pricing needs a confident extraction; otherwise fall
        // back to per-unit pricing
        let weight_priced = weight.valid && weight.confidence >= ctx.options.min_weight_confidence;
        let pricing_type = if weight_priced {
            if weight.is_volume {
                PricingType::Volume
            } else {
                PricingType::Weight
            }
        } else {
            PricingType::Unit
        };
        let pricing = compute_pricing(
            pricing_type,
            fields.total_price.value,
            &weight,
            fields.quantity.value,
        );

        let format_resolved = match pricing_type {
            PricingType::Weight | PricingType::Volume => weight.valid,
            PricingType::Unit => matches!(fields.quantity.value, Some(q) if q > 0.0),
        };

        let confidence = ConfidenceInputs {
            math: math.confidence,
            middle: if pricing_type == PricingType::Unit {
                100
            } else {
                weight.confidence
            },
            core: if fields.core_present() { 100 } else { 50 },
        };

        let validation = GateSequencer::new().run(GateContext {
            description_present: fields.description.is_present(),
            unit_price: fields.unit_price.value,
            total_price: fields.total_price.value,
            format_resolved,
            pricing_valid: pricing.is_valid(),
            math: &math,
            confidence,
            warnings,
        });

        let classification = LineClassification::classify(
            fields.description.get().map(String::as_str),
            fields.total_price.value,
        );

        debug!(
            line_number = ctx.line_number,
            pricing_type = pricing_type.as_str(),
            confidence = validation.overall_confidence,
            can_process = validation.can_process,
            "supply line processed"
        );

        let mut line = ProcessedLine {
            line_number: ctx.line_number,
            fingerprint: line_fingerprint(ctx.line),
            category: ctx.category,
            classification,
            description: fields.description,
            quantity: fields.quantity,
            unit: fields.unit,
            format: format_field,
            unit_price: fields.unit_price,
            total_price: fields.total_price,
            parsed_format: parsed,
            boxing: None,
            weight,
            math,
            pricing_type,
            pricing,
            validation,
            routing: routing_trace(ctx.category, self.kind()),
            flat: FlatLine::default(),
        };
        line.flat = FlatLine::project(&line);
        line
    }
}

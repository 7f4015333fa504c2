//! Count-priced pipeline.
//!
//! Packaging and fee lines are costed per unit, so the middle stage
//! resolves boxing arithmetic ("10/100" meaning 10 packs of 100 pieces)
//! instead of weight. The total piece count drives per-piece costing on
//! the flat view; pricing itself stays per unit of quantity.

use tracing::debug;

use crate::constants::BOXING_MISSING_CONFIDENCE;
use crate::domain::{
    FlatLine, HandlerKind, LineClassification, LineWarning, ParsedFormat, PricingType,
    ProcessedLine, UnitKind, WarningKind, WeightExtraction,
};
use crate::fingerprint::line_fingerprint;
use crate::observability::metrics as obs;
use crate::pipeline::processing::format::{mine_boxing, parse_boxing, parse_format};
use crate::pipeline::processing::handlers::{routing_trace, CoreFields, LineContext, LineHandler};
use crate::pipeline::processing::math::{validate_math, MathInput};
use crate::pipeline::processing::pricing::compute_pricing;
use crate::pipeline::processing::units::classify_unit;
use crate::pipeline::processing::validation::{ConfidenceInputs, GateContext, GateSequencer};

pub struct PackagingHandler;

impl PackagingHandler {
    pub fn new() -> Self {
        Self
    }

    /// Mean of the four base-field confidences
    fn core_confidence(fields: &CoreFields) -> u8 {
        let sum = f64::from(fields.description.confidence)
            + f64::from(fields.quantity.confidence)
            + f64::from(fields.unit_price.confidence)
            + f64::from(fields.total_price.confidence);
        (sum / 4.0).round() as u8
    }
}

impl Default for PackagingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl LineHandler for PackagingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Packaging
    }

    fn name(&self) -> &'static str {
        "packaging"
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

        // Read boxing arithmetic from the format field, falling back to
        // the description text
        let mut boxing = fields.format.get().and_then(|f| parse_boxing(f));
        if fields.format.is_present() && boxing.is_none() {
            warnings.push(
                LineWarning::warning(
                    WarningKind::UnparsedFormat,
                    format!(
                        "Format '{}' did not match any pack notation",
                        fields.format.get().map(String::as_str).unwrap_or_default()
                    ),
                )
                .with_field("format"),
            );
        }
        if boxing.is_none() {
            if let Some(mined) = fields.description.get().and_then(|d| mine_boxing(d)) {
                debug!(
                    total_units = mined.total_units,
                    "recovered pack notation from description"
                );
                warnings.push(
                    LineWarning::info(
                        WarningKind::LowConfidence,
                        "Pack notation mined from description text",
                    )
                    .with_field("format"),
                );
                boxing = Some(mined);
            }
        }
        obs::format::boxing_resolved(boxing.is_some());

        // The structured format view mirrors the boxing read; a resolved
        // pack always reads as a piece count
        let parsed_format = match &boxing {
            Some(b) => ParsedFormat::CountOnly {
                count: b.total_units,
            },
            None => fields
                .format
                .get()
                .map(|f| parse_format(f))
                .unwrap_or(ParsedFormat::Unknown),
        };

        let weight = WeightExtraction::invalid();

        let math = validate_math(&MathInput {
            quantity: fields.quantity.value,
            unit_price: fields.unit_price.value,
            total_price: fields.total_price.value,
            weight_total: None,
            unit_kind,
            bills_by_weight,
            tolerance: ctx.options.math_tolerance,
        });

        let pricing_type = PricingType::Unit;
        let pricing = compute_pricing(
            pricing_type,
            fields.total_price.value,
            &weight,
            fields.quantity.value,
        );

        let confidence = ConfidenceInputs {
            math: math.confidence,
            middle: boxing
                .as_ref()
                .map(|b| b.confidence)
                .unwrap_or(BOXING_MISSING_CONFIDENCE),
            core: Self::core_confidence(&fields),
        };

        let validation = GateSequencer::new().run(GateContext {
            description_present: fields.description.is_present(),
            unit_price: fields.unit_price.value,
            total_price: fields.total_price.value,
            format_resolved: boxing.is_some(),
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
            total_units = boxing.as_ref().map(|b| b.total_units),
            confidence = validation.overall_confidence,
            can_process = validation.can_process,
            "packaging line processed"
        );

        let mut line = ProcessedLine {
            line_number: ctx.line_number,
            fingerprint: line_fingerprint(ctx.line),
            category: ctx.category,
            classification,
            description: fields.description,
            quantity: fields.quantity,
            unit: fields.unit,
            format: fields.format,
            unit_price: fields.unit_price,
            total_price: fields.total_price,
            parsed_format,
            boxing,
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

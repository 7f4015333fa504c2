//! Category routing.
//!
//! Lines are grouped by their resolved category, each group is handed to
//! the pipeline the category table prescribes, and results are scattered
//! back into input order. A line that is not a usable JSON object never
//! reaches a handler; it becomes an errored line so the rest of the
//! batch is unaffected.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::ProcessOptions;
use crate::domain::{
    FlatLine, LineCategory, LineClassification, LineWarning, MathFormula, MathValidation,
    ParsedFormat, PricingResult, PricingType, ProcessedLine, RawLine, RoutingTrace,
    ValidationSummary, WarningKind, WeightExtraction,
};
use crate::domain::{ConfidenceLevel, ExtractedField, HandlerKind};
use crate::fingerprint::line_fingerprint;
use crate::observability::metrics as obs;
use crate::pipeline::processing::extract::{FieldExtractor, CATEGORY};
use crate::pipeline::processing::handlers::{HandlerRegistry, LineContext};
use crate::profile::VendorProfile;

pub struct Router<'a> {
    registry: &'a HandlerRegistry,
}

impl<'a> Router<'a> {
    pub fn new(registry: &'a HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a line's category; anything unstated or unrecognized is
    /// Other
    pub fn categorize(line: &RawLine, profile: Option<&VendorProfile>) -> LineCategory {
        FieldExtractor::new(line, profile)
            .string_field(&CATEGORY)
            .get()
            .map(|c| LineCategory::parse(c))
            .unwrap_or(LineCategory::Other)
    }

    /// Process one line through its category's pipeline
    pub fn route_line(
        &self,
        line: &RawLine,
        line_number: usize,
        profile: Option<&VendorProfile>,
        options: &ProcessOptions,
    ) -> ProcessedLine {
        if !is_usable_object(line) {
            warn!(line_number, "raw line is not a usable JSON object");
            obs::router::malformed();
            return malformed_line(line, line_number, options);
        }

        let category = Self::categorize(line, profile);
        let handler = self.registry.handler_for(category);
        let ctx = LineContext {
            line,
            line_number,
            category,
            profile,
            options,
        };
        let mut processed = handler.process(&ctx);
        obs::router::line_routed(handler.name());

        if !processed.routing.routing_valid {
            // the category table and the dispatch disagree; this is a
            // wiring problem, not a data problem
            warn!(
                line_number,
                category = category.as_str(),
                expected = processed.routing.expected_handler.as_str(),
                actual = processed.routing.actual_handler.as_str(),
                "line reached an unexpected pipeline"
            );
            obs::router::mismatch();
            processed.validation.warnings.push(LineWarning::warning(
                WarningKind::RoutingMismatch,
                processed.routing.reason.clone(),
            ));
            processed.flat = FlatLine::project(&processed);
        }

        processed
    }

    /// Process a whole batch: group by category, dispatch each group,
    /// scatter results back into input order
    pub fn route_batch(
        &self,
        lines: &[RawLine],
        profile: Option<&VendorProfile>,
        options: &ProcessOptions,
    ) -> Vec<ProcessedLine> {
        let mut groups: BTreeMap<LineCategory, Vec<usize>> = BTreeMap::new();
        for (index, line) in lines.iter().enumerate() {
            let category = if is_usable_object(line) {
                Self::categorize(line, profile)
            } else {
                LineCategory::Other
            };
            groups.entry(category).or_default().push(index);
        }

        let mut slots: Vec<Option<ProcessedLine>> = Vec::with_capacity(lines.len());
        slots.resize_with(lines.len(), || None);

        for (category, indices) in groups {
            debug!(
                category = category.as_str(),
                lines = indices.len(),
                "dispatching category group"
            );
            for index in indices {
                let line_number = options.line_number_offset + index + 1;
                slots[index] =
                    Some(self.route_line(&lines[index], line_number, profile, options));
            }
        }

        slots.into_iter().flatten().collect()
    }
}

fn is_usable_object(line: &RawLine) -> bool {
    line.as_object().map(|o| !o.is_empty()).unwrap_or(false)
}

/// Errored stand-in for a line that never reached a handler
fn malformed_line(line: &RawLine, line_number: usize, options: &ProcessOptions) -> ProcessedLine {
    let category = LineCategory::Other;
    let expected = HandlerKind::for_category(category);
    let error = LineWarning::error(
        WarningKind::MalformedLine,
        "Raw line is not a usable JSON object",
    );
    let mut processed = ProcessedLine {
        line_number,
        fingerprint: line_fingerprint(line),
        category,
        classification: LineClassification::Zero,
        description: ExtractedField::missing(),
        quantity: ExtractedField::missing(),
        unit: ExtractedField::missing(),
        format: ExtractedField::missing(),
        unit_price: ExtractedField::missing(),
        total_price: ExtractedField::missing(),
        parsed_format: ParsedFormat::Unknown,
        boxing: None,
        weight: WeightExtraction::invalid(),
        math: MathValidation {
            formula: MathFormula::None,
            expected: 0.0,
            actual: 0.0,
            difference: 0.0,
            tolerance: options.math_tolerance,
            confidence: 0,
            valid: false,
        },
        pricing_type: PricingType::Unit,
        pricing: PricingResult::Unknown,
        validation: ValidationSummary {
            core_fields_present: false,
            format_resolved: false,
            pricing_computable: false,
            can_process: false,
            can_bill: false,
            overall_confidence: 0,
            confidence_level: ConfidenceLevel::Critical,
            warnings: Vec::new(),
            errors: vec![error],
        },
        routing: RoutingTrace {
            input_category: category,
            expected_handler: expected,
            actual_handler: expected,
            routing_valid: true,
            reason: "line rejected before dispatch".to_string(),
        },
        flat: FlatLine::default(),
    };
    processed.flat = FlatLine::project(&processed);
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::handlers::{PackagingHandler, SupplyHandler};
    use serde_json::json;

    fn options() -> ProcessOptions {
        ProcessOptions::default()
    }

    #[test]
    fn batch_results_keep_input_order_across_groups() {
        let registry = HandlerRegistry::new();
        let router = Router::new(&registry);
        let lines = vec![
            json!({"description": "CHICKEN", "category": "food", "quantity": 1, "unit_price": 10.0, "total_price": 10.0}),
            json!({"description": "CUP LIDS", "category": "packaging", "quantity": 1, "format": "10/100", "unit_price": 45.0, "total_price": 45.0}),
            json!({"description": "BEEF", "category": "food", "quantity": 2, "unit_price": 5.0, "total_price": 10.0}),
        ];
        let processed = router.route_batch(&lines, None, &options());

        assert_eq!(processed.len(), 3);
        assert_eq!(processed[0].line_number, 1);
        assert_eq!(processed[1].line_number, 2);
        assert_eq!(processed[2].line_number, 3);
        assert_eq!(processed[0].routing.actual_handler, HandlerKind::Supply);
        assert_eq!(processed[1].routing.actual_handler, HandlerKind::Packaging);
        assert_eq!(processed[2].routing.actual_handler, HandlerKind::Supply);
        assert_eq!(processed[0].description.value.as_deref(), Some("CHICKEN"));
        assert_eq!(processed[2].description.value.as_deref(), Some("BEEF"));
    }

    #[test]
    fn malformed_line_errors_without_aborting_the_batch() {
        let registry = HandlerRegistry::new();
        let router = Router::new(&registry);
        let lines = vec![
            json!({"description": "GOOD A", "quantity": 1, "unit_price": 1.0, "total_price": 1.0}),
            json!(42),
            json!({"description": "GOOD B", "quantity": 1, "unit_price": 2.0, "total_price": 2.0}),
        ];
        let processed = router.route_batch(&lines, None, &options());

        assert_eq!(processed.len(), 3);
        assert!(processed[0].validation.can_bill);
        assert!(!processed[1].validation.can_bill);
        assert_eq!(processed[1].validation.errors.len(), 1);
        assert_eq!(
            processed[1].validation.errors[0].kind,
            WarningKind::MalformedLine
        );
        assert!(processed[2].validation.can_bill);
    }

    #[test]
    fn empty_object_is_malformed() {
        let registry = HandlerRegistry::new();
        let router = Router::new(&registry);
        let processed = router.route_line(&json!({}), 1, None, &options());
        assert_eq!(
            processed.validation.errors[0].kind,
            WarningKind::MalformedLine
        );
    }

    #[test]
    fn cross_wired_registry_surfaces_a_routing_mismatch() {
        // packaging handler in the supply slot
        let registry = HandlerRegistry::with_handlers(
            Box::new(PackagingHandler::new()),
            Box::new(SupplyHandler::new()),
        );
        let router = Router::new(&registry);
        let line = json!({"description": "CHICKEN", "category": "food", "quantity": 1, "unit_price": 10.0, "total_price": 10.0});
        let processed = router.route_line(&line, 1, None, &options());

        assert!(!processed.routing.routing_valid);
        assert_eq!(processed.routing.expected_handler, HandlerKind::Supply);
        assert_eq!(processed.routing.actual_handler, HandlerKind::Packaging);
        assert!(processed
            .validation
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::RoutingMismatch));
        assert_eq!(
            processed.flat.warning_count,
            processed.validation.warnings.len()
        );
    }

    #[test]
    fn category_resolution_defaults_to_other() {
        assert_eq!(
            Router::categorize(&json!({"description": "X"}), None),
            LineCategory::Other
        );
        assert_eq!(
            Router::categorize(&json!({"category": "Packaging"}), None),
            LineCategory::Packaging
        );
        assert_eq!(
            Router::categorize(&json!({"category": "weird"}), None),
            LineCategory::Other
        );
    }
}

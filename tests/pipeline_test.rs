use serde_json::json;
use std::io::Write;

use invoice_extractor::config::ProcessOptions;
use invoice_extractor::domain::{
    ConfidenceLevel, LineClassification, MathFormula, PricingResult, PricingType, SourceKind,
    WarningKind,
};
use invoice_extractor::engine::ExtractionEngine;
use invoice_extractor::profile::VendorProfile;

#[test]
fn supply_case_line_resolves_weight_math_and_pricing() {
    let engine = ExtractionEngine::new();
    let line = json!({
        "description": "CHICKEN BREAST BNLS",
        "category": "food",
        "quantity": 4,
        "unit": "CS",
        "format": "2/5KG",
        "unit_price": 24.99,
        "total_price": 99.96
    });
    let processed = engine.process_line(&line, None);

    assert_eq!(processed.flat.format_type, "pack_weight");
    assert_eq!(processed.weight.total, Some(40.0));
    assert_eq!(processed.flat.weight_grams, Some(40_000.0));
    assert_eq!(processed.math.formula, MathFormula::Unit);
    assert!(processed.math.valid);
    assert_eq!(processed.pricing_type, PricingType::Weight);
    assert_eq!(processed.flat.price_per_g, Some(0.002499));
    assert_eq!(processed.flat.price_per_kg, Some(2.499));
    assert_eq!(processed.flat.price_per_lb, Some(1.1335));
    assert!(processed.validation.can_process);
    assert!(processed.validation.can_bill);
    assert_eq!(processed.validation.overall_confidence, 97);
    assert_eq!(processed.validation.confidence_level, ConfidenceLevel::High);
}

#[test]
fn packaging_line_decodes_boxing_and_piece_cost() {
    let engine = ExtractionEngine::new();
    let line = json!({
        "description": "CUP LIDS CLEAR 16OZ",
        "category": "packaging",
        "quantity": 1,
        "format": "10/100",
        "unit_price": 45.00,
        "total_price": 45.00
    });
    let processed = engine.process_line(&line, None);

    let boxing = processed.boxing.as_ref().expect("boxing should resolve");
    assert_eq!(boxing.pack_count, 10.0);
    assert_eq!(boxing.units_per_pack, 100.0);
    assert_eq!(boxing.total_units, 1000.0);
    assert_eq!(processed.flat.units_per_case, Some(1000.0));
    assert_eq!(processed.flat.cost_per_piece, Some(0.045));
    assert_eq!(processed.pricing_type, PricingType::Unit);
    assert!(processed.validation.can_process);
    assert_eq!(processed.validation.overall_confidence, 96);
}

#[test]
fn catch_weight_line_bills_the_shipped_weight() {
    let engine = ExtractionEngine::new();
    let line = json!({
        "description": "BEEF RIBEYE WHOLE",
        "category": "food",
        "quantity": 12.43,
        "unit": "LB",
        "format": "1/~12 LB",
        "unit_price": 8.99,
        "total_price": 111.75
    });
    let processed = engine.process_line(&line, None);

    assert_eq!(processed.flat.format_type, "approximate_weight");
    assert_eq!(processed.weight.total, Some(12.43));
    assert_eq!(processed.weight.unit, "lb");
    assert_eq!(processed.math.formula, MathFormula::Weight);
    assert!(processed.math.valid);
    assert_eq!(processed.flat.price_per_lb, Some(8.9903));
    assert!(processed
        .validation
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::ApproximateFormat));
    assert!(processed.validation.can_process);
}

#[test]
fn math_mismatch_degrades_but_keeps_the_line_billable() {
    let engine = ExtractionEngine::new();
    let line = json!({
        "description": "ASSORTED DRY GOODS",
        "category": "supply",
        "quantity": 10,
        "unit": "EA",
        "unit_price": 5.00,
        "total_price": 47.97
    });
    let processed = engine.process_line(&line, None);

    assert!(!processed.math.valid);
    assert_eq!(processed.math.expected, 50.00);
    assert_eq!(processed.math.difference, 2.03);
    assert!(processed
        .validation
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::MathMismatch));
    assert!(processed.validation.can_bill);
    // 0.5*0 + 0.3*100 + 0.2*100 = 50
    assert_eq!(processed.validation.overall_confidence, 50);
    assert_eq!(processed.validation.confidence_level, ConfidenceLevel::Low);
}

#[test]
fn zero_priced_line_passes_math_but_cannot_process() {
    let engine = ExtractionEngine::new();
    let line = json!({
        "description": "SAMPLE PRODUCT NC",
        "category": "food",
        "quantity": 4,
        "unit": "CS",
        "format": "2/5KG",
        "unit_price": 0.0,
        "total_price": 0.0
    });
    let processed = engine.process_line(&line, None);

    // nothing is priced, so the arithmetic is trivially consistent
    assert!(processed.math.valid);
    assert_eq!(processed.math.formula, MathFormula::None);
    assert_eq!(processed.math.confidence, 100);
    // but no normalized cost can exist, which blocks the third gate
    assert_eq!(processed.pricing, PricingResult::Unknown);
    assert!(!processed.validation.pricing_computable);
    assert!(!processed.validation.can_process);
    // the stated zero prices still satisfy the billing gate
    assert!(processed.validation.can_bill);
    let zero_infos = processed
        .validation
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::ZeroPrice)
        .count();
    assert_eq!(zero_infos, 2);
    assert!(processed
        .validation
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::PricingUnavailable));
}

#[test]
fn missing_description_blocks_billing_with_an_error() {
    let engine = ExtractionEngine::new();
    let line = json!({
        "category": "food",
        "quantity": 1,
        "unit_price": 5.00,
        "total_price": 5.00
    });
    let processed = engine.process_line(&line, None);

    assert!(!processed.validation.can_bill);
    assert_eq!(processed.validation.errors.len(), 1);
    assert_eq!(processed.validation.errors[0].kind, WarningKind::MissingField);
}

#[test]
fn vendor_mapping_overrides_the_direct_field() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(
        file,
        r#"
vendor_id = "acme-foods"
name = "Acme Foods"

[columns.quantity]
column = "qty_shipped"
"#
    )
    .unwrap();
    let profile = VendorProfile::load(file.path()).unwrap();

    let engine = ExtractionEngine::new();
    // the direct quantity field disagrees with the vendor's real column
    let line = json!({
        "description": "GREEN BEANS",
        "category": "food",
        "quantity": 99,
        "qty_shipped": 4,
        "unit_price": 10.00,
        "total_price": 40.00
    });
    let processed = engine.process_line(&line, Some(&profile));

    assert_eq!(processed.quantity.value, Some(4.0));
    assert_eq!(processed.quantity.source, SourceKind::Mapped);
    assert_eq!(processed.quantity.confidence, 95);
    assert!(processed.math.valid);
}

#[test]
fn reprocessing_a_batch_is_idempotent() {
    let engine = ExtractionEngine::new();
    let lines = vec![
        json!({
            "description": "CHICKEN BREAST BNLS",
            "category": "food",
            "quantity": 4,
            "unit": "CS",
            "format": "2/5KG",
            "unit_price": 24.99,
            "total_price": 99.96
        }),
        json!({
            "description": "CUP LIDS",
            "category": "packaging",
            "quantity": 2,
            "format": "10/100",
            "unit_price": 45.00,
            "total_price": 90.00
        }),
    ];

    let first = engine.process_batch(&lines, None);
    let second = engine.process_batch(&lines, None);

    // batch identity differs, line content does not
    assert_ne!(first.batch_id, second.batch_id);
    assert_eq!(
        serde_json::to_value(&first.lines).unwrap(),
        serde_json::to_value(&second.lines).unwrap()
    );
    for (a, b) in first.lines.iter().zip(&second.lines) {
        assert_eq!(a.fingerprint, b.fingerprint);
        assert!(a.fingerprint.starts_with("line:sha256:"));
    }
}

#[test]
fn malformed_line_is_contained_to_its_slot() {
    let engine = ExtractionEngine::new();
    let lines = vec![
        json!({"description": "GOOD A", "quantity": 1, "unit_price": 2.0, "total_price": 2.0}),
        json!(["not", "an", "object"]),
        json!({"description": "GOOD B", "quantity": 1, "unit_price": 3.0, "total_price": 3.0}),
    ];
    let result = engine.process_batch(&lines, None);

    assert_eq!(result.lines.len(), 3);
    assert_eq!(result.lines[1].line_number, 2);
    assert!(!result.lines[1].validation.can_bill);
    assert!(result.lines[1]
        .validation
        .errors
        .iter()
        .any(|w| w.kind == WarningKind::MalformedLine));
    assert!(result.lines[0].validation.can_bill);
    assert!(result.lines[2].validation.can_bill);
    assert_eq!(result.summary.errored_lines, 1);
    assert_eq!(result.summary.subtotal, 5.0);
}

#[test]
fn batch_summary_rolls_lines_up_by_classification() {
    let engine = ExtractionEngine::new();
    let lines = vec![
        json!({
            "description": "CHICKEN BREAST BNLS",
            "category": "food",
            "quantity": 4,
            "unit": "CS",
            "format": "2/5KG",
            "unit_price": 24.99,
            "total_price": 99.96
        }),
        json!({
            "description": "BOTTLE DEPOSIT",
            "category": "fee",
            "quantity": 24,
            "unit_price": 0.05,
            "total_price": 1.20
        }),
        json!({
            "description": "FUEL SURCHARGE",
            "category": "fee",
            "total_price": 7.50
        }),
        json!({
            "description": "CREDIT RETURNED GOODS",
            "category": "other",
            "quantity": 1,
            "unit_price": -12.50,
            "total_price": -12.50
        }),
    ];
    let result = engine.process_batch(&lines, None);
    let summary = &result.summary;

    assert_eq!(summary.total_lines, 4);
    assert_eq!(summary.classes.product.count, 1);
    assert_eq!(summary.classes.product.total, 99.96);
    assert_eq!(summary.classes.deposit.count, 1);
    assert_eq!(summary.classes.deposit.total, 1.20);
    assert_eq!(summary.classes.fee.count, 1);
    assert_eq!(summary.classes.fee.total, 7.50);
    assert_eq!(summary.classes.credit.count, 1);
    assert_eq!(summary.classes.credit.total, -12.50);
    // all four lines have description plus a price, so all bill
    assert_eq!(summary.billable_lines, 4);
    assert_eq!(summary.subtotal, 96.16);

    assert_eq!(
        result.lines[1].classification,
        LineClassification::Deposit
    );
    assert_eq!(result.lines[2].classification, LineClassification::Fee);
    assert_eq!(result.lines[3].classification, LineClassification::Credit);
}

#[test]
fn categories_route_to_their_expected_pipelines() {
    let engine = ExtractionEngine::new();
    let supply_line = engine.process_line(
        &json!({"description": "X", "category": "food", "quantity": 1, "unit_price": 1.0, "total_price": 1.0}),
        None,
    );
    let packaging_line = engine.process_line(
        &json!({"description": "X", "category": "packaging", "quantity": 1, "unit_price": 1.0, "total_price": 1.0}),
        None,
    );
    let fee_line = engine.process_line(
        &json!({"description": "X", "category": "fees", "quantity": 1, "unit_price": 1.0, "total_price": 1.0}),
        None,
    );
    let unknown_line = engine.process_line(
        &json!({"description": "X", "category": "whatever", "quantity": 1, "unit_price": 1.0, "total_price": 1.0}),
        None,
    );

    assert_eq!(supply_line.routing.actual_handler.as_str(), "supply");
    assert_eq!(packaging_line.routing.actual_handler.as_str(), "packaging");
    assert_eq!(fee_line.routing.actual_handler.as_str(), "packaging");
    assert_eq!(unknown_line.routing.actual_handler.as_str(), "supply");
    assert!(supply_line.routing.routing_valid);
    assert!(packaging_line.routing.routing_valid);
    assert!(fee_line.routing.routing_valid);
    assert!(unknown_line.routing.routing_valid);
}

#[test]
fn line_number_offset_flows_through_batches() {
    let engine = ExtractionEngine::with_options(ProcessOptions {
        line_number_offset: 50,
        ..ProcessOptions::default()
    });
    let lines = vec![
        json!({"description": "A", "quantity": 1, "unit_price": 1.0, "total_price": 1.0}),
        json!({"description": "B", "quantity": 1, "unit_price": 1.0, "total_price": 1.0}),
    ];
    let result = engine.process_batch(&lines, None);
    assert_eq!(result.lines[0].line_number, 51);
    assert_eq!(result.lines[1].line_number, 52);
}

#[test]
fn bills_by_weight_profile_reads_quantity_as_weight() {
    let profile = {
        let mut p = VendorProfile::named("meat-house", "Meat House");
        p.bills_by_weight = true;
        p
    };
    let engine = ExtractionEngine::new();
    // 15.5 lb of product at 4.00/lb
    let line = json!({
        "description": "PORK SHOULDER",
        "category": "food",
        "quantity": 15.5,
        "unit_price": 4.00,
        "total_price": 62.00
    });
    let processed = engine.process_line(&line, Some(&profile));

    assert_eq!(processed.weight.total, Some(15.5));
    assert_eq!(processed.weight.unit, "lb");
    assert_eq!(processed.math.formula, MathFormula::Weight);
    assert!(processed.math.valid);
    assert_eq!(processed.pricing_type, PricingType::Weight);
}
